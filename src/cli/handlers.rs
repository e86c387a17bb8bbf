use super::commands::{BuildArgs, CreateArgs, DEFAULT_DEFINITION_FILES};
use crate::config::BuilderConfig;
use crate::containerfile::{compile, BuildContext, BuildOptions};
use crate::definition::{load_definition, DefinitionError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::runner::ContainerBuild;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A staged build context and where its build file landed
#[derive(Debug)]
pub struct CreatedContext {
    pub options: BuildOptions,
    pub containerfile: PathBuf,
}

pub fn handle_create(args: &CreateArgs, quiet: bool, verbose: bool) -> i32 {
    match create_context(args, &BuilderConfig::default(), &RealFileSystem) {
        Ok(created) => {
            if !quiet {
                println!(
                    "Complete! The build context can be found at: {}",
                    created.options.build_context.display()
                );
            }
            0
        }
        Err(e) => {
            report_error(&e, verbose);
            1
        }
    }
}

pub async fn handle_build(args: &BuildArgs, quiet: bool, verbose: bool) -> i32 {
    let created = match create_context(&args.create, &BuilderConfig::default(), &RealFileSystem) {
        Ok(created) => created,
        Err(e) => {
            report_error(&e, verbose);
            return 1;
        }
    };

    let mut build = ContainerBuild::new(
        created.options.container_runtime,
        created.containerfile,
        created.options.build_context.clone(),
    );
    build.tags = args.tags();
    build.build_args = args.build_args.clone();
    build.no_cache = args.no_cache;

    match build.run().await {
        Ok(()) => {
            if !quiet {
                println!("Complete! The image is tagged {}", build.tags.join(", "));
            }
            0
        }
        Err(e) => {
            report_error(&anyhow::Error::from(e), verbose);
            1
        }
    }
}

/// Validate the definition, then stage the build context and write the
/// build file. Nothing is written when validation fails.
pub fn create_context(
    args: &CreateArgs,
    config: &BuilderConfig,
    fs: &dyn FileSystem,
) -> Result<CreatedContext> {
    config.validate()?;
    let options = build_options(args, config)?;
    if let Some(keyring) = &options.galaxy_keyring {
        if !fs.is_file(keyring) {
            bail!("Galaxy keyring file {} does not exist.", keyring.display());
        }
    }

    let path = definition_path(args.file.as_deref(), fs);
    info!("Using definition file {}", path.display());
    let definition = load_definition(&path, fs)?;

    let plan = compile(&definition, &options);
    let context = BuildContext::new(fs);
    let report = context.stage(&definition, &options)?;
    debug!(skipped = ?report.skipped, "Build context staged");
    let containerfile = context.write_containerfile(&plan, &options)?;

    Ok(CreatedContext {
        options,
        containerfile,
    })
}

/// Merge command line flags over configuration
pub fn build_options(args: &CreateArgs, config: &BuilderConfig) -> Result<BuildOptions> {
    let container_runtime = match args.container_runtime {
        Some(runtime) => runtime.into(),
        None => config.runtime()?,
    };
    let build_context = args
        .context
        .clone()
        .unwrap_or_else(|| config.build_context.clone());

    Ok(BuildOptions {
        container_runtime,
        output_filename: args.output_filename.clone(),
        build_context,
        galaxy_keyring: args.galaxy_keyring.clone(),
        galaxy_required_valid_signature_count: args.galaxy_required_valid_signature_count.clone(),
        galaxy_ignore_signature_status_codes: args.galaxy_ignore_signature_status_codes.clone(),
    })
}

/// The explicit file, else the first default name that exists, else the
/// first default name
pub fn definition_path(file: Option<&Path>, fs: &dyn FileSystem) -> PathBuf {
    if let Some(file) = file {
        return file.to_path_buf();
    }

    DEFAULT_DEFINITION_FILES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| fs.is_file(candidate))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFINITION_FILES[0]))
}

/// Lines printed to stderr for a failed command
pub fn error_lines(err: &anyhow::Error, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();

    match err.downcast_ref::<DefinitionError>() {
        Some(definition_err) => {
            lines.push(format!("Error: {}", definition_err.message()));
            if let Some(path) = definition_err.path().filter(|p| !p.is_empty()) {
                lines.push(format!("  at: {}", path.join(".")));
            }
        }
        None => lines.push(format!("Error: {}", err)),
    }

    if verbose {
        lines.extend(err.chain().skip(1).map(|cause| format!("  caused by: {}", cause)));
    }
    lines
}

fn report_error(err: &anyhow::Error, verbose: bool) {
    for line in error_lines(err, verbose) {
        eprintln!("{}", line);
    }
}
