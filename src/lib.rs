//! ee-builder - build Ansible execution environment images
//!
//! A definition file describes the base image, the python, galaxy and system
//! requirements and any custom build steps of an execution environment. This
//! library validates such a definition and compiles it into a multi-stage
//! container build file plus the build context that file expects.
//!
//! # Example Usage
//!
//! ```no_run
//! use ee_builder::containerfile::{compile, BuildContext, BuildOptions};
//! use ee_builder::definition::load_definition;
//! use ee_builder::fs::RealFileSystem;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = RealFileSystem;
//! let definition = load_definition(Path::new("execution-environment.yml"), &fs)?;
//!
//! let options = BuildOptions::new("context");
//! let plan = compile(&definition, &options);
//!
//! let context = BuildContext::new(&fs);
//! context.stage(&definition, &options)?;
//! context.write_containerfile(&plan, &options)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`definition`]: loading, schema validation and normalization
//! - [`containerfile`]: the build plan compiler and build context staging
//! - [`runner`]: invoking podman or docker on a staged context

pub mod cli;
pub mod config;
pub mod containerfile;
pub mod definition;
pub mod fs;
pub mod runner;
pub mod util;

pub use config::{BuilderConfig, ConfigError};
pub use containerfile::{compile, BuildContext, BuildOptions, BuildPlan, ContainerRuntime};
pub use definition::{load_definition, Definition, DefinitionError};
pub use runner::{ContainerBuild, RunnerError};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
