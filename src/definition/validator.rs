//! Definition validation
//!
//! `validate` peeks at `version`, deserializes the raw value into the closed
//! record for that version, folds legacy keys into the version 2 shape, then
//! checks the rules a type cannot express: referenced files must exist and
//! image references must carry a tag.

use super::error::DefinitionError;
use super::image::{ImageDescription, ImageKey};
use super::schema::{
    AdditionalBuildSteps, DefinitionV1, DefinitionV2, DependencyFiles, SchemaVersion,
};
use super::{
    AdditionalBuildFile, BuildArgDefaults, Definition, Dependencies, DependencyKind,
    DEFAULT_BUILDER_IMAGE,
};
use crate::fs::FileSystem;
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a raw definition and normalize it.
///
/// Relative paths are resolved against `reference_dir`, normally the
/// directory holding the definition file.
pub fn validate(
    raw: &Value,
    reference_dir: &Path,
    fs: &dyn FileSystem,
) -> Result<Definition, DefinitionError> {
    let mapping = raw
        .as_mapping()
        .ok_or_else(|| DefinitionError::NotAMapping(kind_name(raw)))?;
    let version = peek_version(mapping)?;
    debug!(%version, "Selected definition schema");

    let definition = match version {
        SchemaVersion::V1 => normalize_v1(parse_record(raw)?, reference_dir, fs)?,
        SchemaVersion::V2 => normalize_v2(parse_record(raw)?, reference_dir, fs)?,
    };

    Ok(definition)
}

/// Read `version`, defaulting to 1 when absent
fn peek_version(mapping: &Mapping) -> Result<SchemaVersion, DefinitionError> {
    let Some(value) = mapping.get("version") else {
        return Ok(SchemaVersion::V1);
    };

    // Booleans read as 0/1 here; the schema check rejects them afterwards.
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i128)),
        Value::Bool(b) => Some(i128::from(*b)),
        Value::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
    .ok_or_else(|| DefinitionError::VersionNotInteger(render_scalar(value)))?;

    i64::try_from(number)
        .ok()
        .and_then(SchemaVersion::from_number)
        .ok_or(DefinitionError::UnsupportedVersion(number))
}

fn parse_record<T: DeserializeOwned>(raw: &Value) -> Result<T, DefinitionError> {
    serde_path_to_error::deserialize(raw.clone()).map_err(|err| {
        let path = key_path(err.path());
        DefinitionError::schema(err.into_inner().to_string(), path)
    })
}

fn key_path(path: &serde_path_to_error::Path) -> Vec<String> {
    path.iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            _ => None,
        })
        .collect()
}

fn normalize_v1(
    record: DefinitionV1,
    reference_dir: &Path,
    fs: &dyn FileSystem,
) -> Result<Definition, DefinitionError> {
    let mut build_arg_defaults = BuildArgDefaults {
        ee_builder_image: Some(DEFAULT_BUILDER_IMAGE.to_string()),
        ..Default::default()
    };
    if let Some(args) = record.build_arg_defaults {
        if let Some(image) = non_empty(args.ee_base_image) {
            build_arg_defaults.ee_base_image = image;
        }
        if let Some(image) = non_empty(args.ee_builder_image) {
            build_arg_defaults.ee_builder_image = Some(image);
        }
        build_arg_defaults.galaxy_cli_collection_opts = non_empty(args.galaxy_cli_collection_opts);
        build_arg_defaults.galaxy_cli_role_opts = non_empty(args.galaxy_cli_role_opts);
    }

    let mut additional_build_steps = AdditionalBuildSteps::default();
    if let Some(legacy) = record.additional_build_steps {
        additional_build_steps.alias_legacy(legacy);
    }

    let definition = Definition {
        version: SchemaVersion::V1,
        reference_dir: reference_dir.to_path_buf(),
        build_arg_defaults,
        base_image: None,
        builder_image: None,
        dependencies: resolve_files(record.dependencies, reference_dir, fs),
        additional_build_steps,
        ansible_config: resolve_path(record.ansible_config, reference_dir, fs),
        additional_build_files: Vec::new(),
    };

    check_files(&definition, fs)?;
    Ok(definition)
}

fn normalize_v2(
    record: DefinitionV2,
    reference_dir: &Path,
    fs: &dyn FileSystem,
) -> Result<Definition, DefinitionError> {
    let mut build_arg_defaults = BuildArgDefaults::default();
    if let Some(args) = record.build_arg_defaults {
        build_arg_defaults.galaxy_cli_collection_opts = non_empty(args.galaxy_cli_collection_opts);
        build_arg_defaults.galaxy_cli_role_opts = non_empty(args.galaxy_cli_role_opts);
    }

    let mut dependencies = Dependencies::default();
    if let Some(deps) = record.dependencies {
        dependencies = resolve_files(
            Some(DependencyFiles {
                python: deps.python,
                galaxy: deps.galaxy,
                system: deps.system,
            }),
            reference_dir,
            fs,
        );
        if let Some(interpreter) = deps.python_interpreter {
            dependencies.python_package_name = non_empty(interpreter.package_system);
            dependencies.python_path = non_empty(interpreter.python_path);
        }
        let refs: Vec<String> = [deps.ansible_core, deps.ansible_runner]
            .into_iter()
            .flatten()
            .filter_map(|package| non_empty(package.package_pip))
            .collect();
        if !refs.is_empty() {
            dependencies.ansible_install_refs = Some(refs.join(" "));
        }
    }

    let additional_build_steps = record
        .additional_build_steps
        .map(AdditionalBuildSteps::from)
        .unwrap_or_default();

    let additional_build_files = record
        .additional_build_files
        .unwrap_or_default()
        .into_iter()
        .map(|file| AdditionalBuildFile {
            src: file.src,
            dest: file.dest,
        })
        .collect();

    let mut definition = Definition {
        version: SchemaVersion::V2,
        reference_dir: reference_dir.to_path_buf(),
        build_arg_defaults,
        base_image: None,
        builder_image: None,
        dependencies,
        additional_build_steps,
        ansible_config: resolve_path(record.ansible_config, reference_dir, fs),
        additional_build_files,
    };

    // File existence is checked before image tags.
    check_files(&definition, fs)?;

    if let Some(images) = record.images {
        if let Some(base) = images.base_image {
            let base = ImageDescription::from_record(ImageKey::BaseImage, base)?;
            definition.build_arg_defaults.ee_base_image = base.name.clone();
            definition.base_image = Some(base);
        }
        if let Some(builder) = images.builder_image {
            let builder = ImageDescription::from_record(ImageKey::BuilderImage, builder)?;
            definition.build_arg_defaults.ee_builder_image = Some(builder.name.clone());
            definition.builder_image = Some(builder);
        }
    }

    Ok(definition)
}

fn check_files(definition: &Definition, fs: &dyn FileSystem) -> Result<(), DefinitionError> {
    for kind in DependencyKind::ALL {
        if let Some(path) = definition.dependencies.path(kind) {
            if !fs.is_file(path) {
                return Err(DefinitionError::MissingDependency(path.to_path_buf()));
            }
        }
    }

    if let Some(config) = &definition.ansible_config {
        if !fs.is_file(config) {
            return Err(DefinitionError::MissingAnsibleConfig(config.clone()));
        }
    }

    Ok(())
}

fn resolve_files(
    files: Option<DependencyFiles>,
    reference_dir: &Path,
    fs: &dyn FileSystem,
) -> Dependencies {
    let Some(files) = files else {
        return Dependencies::default();
    };

    Dependencies {
        python: resolve_path(files.python, reference_dir, fs),
        galaxy: resolve_path(files.galaxy, reference_dir, fs),
        system: resolve_path(files.system, reference_dir, fs),
        ..Default::default()
    }
}

fn resolve_path(path: Option<String>, reference_dir: &Path, fs: &dyn FileSystem) -> Option<PathBuf> {
    non_empty(path).map(|path| fs.resolve(reference_dir, &path))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged value",
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| kind_name(other).to_string()),
    }
}
