use crate::containerfile::ContainerRuntime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default definition file names, in lookup order
pub const DEFAULT_DEFINITION_FILES: [&str; 2] =
    ["execution-environment.yml", "execution-environment.yaml"];

/// Image tag used by `build` when none is given
pub const DEFAULT_TAG: &str = "ansible-execution-env:latest";

/// Compile execution environment definitions into container build files
#[derive(Parser, Debug)]
#[command(
    name = "ee-builder",
    about = "Build Ansible execution environment images from a definition file",
    version,
    author,
    long_about = "ee-builder validates a versioned execution environment definition, \
                  compiles it into a four stage container build file and stages the \
                  files it needs into a build context. The build command then hands \
                  that context to podman or docker."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose output, including error causes"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Create a build context and build file",
        long_about = "Validates the definition, stages its dependency files and helper \
                      scripts into the build context and writes the build file, without \
                      running a container build.\n\n\
                      Examples:\n  \
                      ee-builder create\n  \
                      ee-builder create -f ee.yml -c /tmp/ctx\n  \
                      ee-builder create --container-runtime docker --galaxy-keyring keys.gpg"
    )]
    Create(CreateArgs),

    #[command(
        about = "Create a build context and build the image",
        long_about = "Runs create, then builds the image with the selected container runtime.\n\n\
                      Examples:\n  \
                      ee-builder build -t my-ee:1.0\n  \
                      ee-builder build --build-arg EE_BASE_IMAGE=quay.io/org/runner:2 --no-cache"
    )]
    Build(BuildArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    #[arg(
        short = 'f',
        long,
        value_name = "FILE",
        help = "Definition file (defaults to execution-environment.yml or .yaml)"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        short = 'c',
        long,
        value_name = "DIR",
        help = "Build context directory (defaults to EE_BUILDER_CONTEXT or ./context)"
    )]
    pub context: Option<PathBuf>,

    #[arg(long, value_enum, help = "Container runtime the build file is written for")]
    pub container_runtime: Option<RuntimeArg>,

    #[arg(long, value_name = "NAME", help = "Name of the generated build file")]
    pub output_filename: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        help = "GPG keyring used to verify collection signatures"
    )]
    pub galaxy_keyring: Option<PathBuf>,

    #[arg(
        long,
        value_name = "COUNT",
        value_parser = parse_signature_count,
        help = "Valid signatures required per collection; prefix with + to reject unsigned ones"
    )]
    pub galaxy_required_valid_signature_count: Option<String>,

    #[arg(
        long = "galaxy-ignore-signature-status-code",
        value_name = "CODE",
        help = "GPG status code to ignore during signature verification (repeatable)"
    )]
    pub galaxy_ignore_signature_status_codes: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub create: CreateArgs,

    #[arg(short = 't', long = "tag", value_name = "TAG", help = "Image tag (repeatable)")]
    pub tags: Vec<String>,

    #[arg(
        long = "build-arg",
        value_name = "KEY[=VALUE]",
        help = "Build argument passed to the container runtime (repeatable)"
    )]
    pub build_args: Vec<String>,

    #[arg(long, help = "Do not use cached layers")]
    pub no_cache: bool,
}

impl BuildArgs {
    /// Tags to build, falling back to the default tag
    pub fn tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            vec![DEFAULT_TAG.to_string()]
        } else {
            self.tags.clone()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeArg {
    Podman,
    Docker,
}

impl From<RuntimeArg> for ContainerRuntime {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Podman => ContainerRuntime::Podman,
            RuntimeArg::Docker => ContainerRuntime::Docker,
        }
    }
}

fn parse_signature_count(s: &str) -> Result<String, String> {
    let digits = s.strip_prefix('+').unwrap_or(s);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "Invalid signature count: {}. Expected a number, optionally prefixed with +",
            s
        ))
    }
}
