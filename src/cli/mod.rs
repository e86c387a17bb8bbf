pub mod commands;
pub mod handlers;

pub use commands::{BuildArgs, CliArgs, Commands, CreateArgs, RuntimeArg};
pub use handlers::{create_context, handle_build, handle_create};
