//! Build Plan Compiler
//!
//! Turns a validated [`Definition`](crate::definition::Definition) into a
//! [`BuildPlan`] of four stages (base, galaxy, builder, final) and stages the
//! files that plan refers to into the build context.

pub mod compiler;
pub mod constants;
pub mod context;
pub mod galaxy;
pub mod options;
pub mod plan;

pub use compiler::compile;
pub use context::{BuildContext, StagingReport, HELPER_SCRIPTS};
pub use galaxy::{collection_install_args, collection_install_env, CollectionInstallArg};
pub use options::{BuildOptions, ContainerRuntime};
pub use plan::{BuildPlan, Stage, StageKind};
