use ee_builder::cli::commands::{CliArgs, Commands};
use ee_builder::cli::handlers::{handle_build, handle_create};
use ee_builder::util::logging::{config_from_env, init_logging, parse_level};
use ee_builder::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("ee-builder v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Create(create_args) => handle_create(create_args, args.quiet, args.verbose),
        Commands::Build(build_args) => handle_build(build_args, args.quiet, args.verbose).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();

    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
