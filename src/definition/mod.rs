//! Execution environment definitions
//!
//! A definition is read from YAML, validated against the closed schema of
//! its declared `version`, and normalized into a single [`Definition`] shape
//! so the compiler never has to care which version the user wrote.
//!
//! # Example
//!
//! ```no_run
//! use ee_builder::definition::load_definition;
//! use ee_builder::fs::RealFileSystem;
//! use std::path::Path;
//!
//! let definition = load_definition(Path::new("execution-environment.yml"), &RealFileSystem)?;
//! println!("schema version {}", definition.version);
//! # Ok::<(), ee_builder::definition::DefinitionError>(())
//! ```

pub mod error;
pub mod image;
pub mod schema;
pub mod validator;

pub use error::DefinitionError;
pub use image::{ImageDescription, ImageKey};
pub use schema::{AdditionalBuildSteps, SchemaVersion, StepCommands, StepSection};
pub use validator::validate;

use crate::fs::FileSystem;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_IMAGE: &str = "quay.io/ansible/ansible-runner:latest";
pub const DEFAULT_BUILDER_IMAGE: &str = "quay.io/ansible/ansible-builder:latest";
pub const DEFAULT_PYTHON_PATH: &str = "/usr/bin/python3";

/// The three requirement files a definition can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Python,
    Galaxy,
    System,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Python,
        DependencyKind::Galaxy,
        DependencyKind::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Python => "python",
            DependencyKind::Galaxy => "galaxy",
            DependencyKind::System => "system",
        }
    }
}

/// Resolved requirement files plus the interpreter bootstrap settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Python requirements file
    pub python: Option<PathBuf>,
    /// Galaxy roles/collections requirements file
    pub galaxy: Option<PathBuf>,
    /// bindep system package requirements file
    pub system: Option<PathBuf>,
    /// System package providing the python interpreter (`PYPKG`)
    pub python_package_name: Option<String>,
    /// Interpreter path inside the image (`PYCMD`)
    pub python_path: Option<String>,
    /// Space-separated pip references installed into the base image
    /// (`ANSIBLE_INSTALL_REFS`)
    pub ansible_install_refs: Option<String>,
}

impl Dependencies {
    /// Absolute path of the requirement file of `kind`, if declared
    pub fn path(&self, kind: DependencyKind) -> Option<&Path> {
        match kind {
            DependencyKind::Python => self.python.as_deref(),
            DependencyKind::Galaxy => self.galaxy.as_deref(),
            DependencyKind::System => self.system.as_deref(),
        }
    }

    /// Whether any python, galaxy or system requirement file is declared
    pub fn has_requirements(&self) -> bool {
        DependencyKind::ALL
            .iter()
            .any(|kind| self.path(*kind).is_some())
    }
}

/// Values for the build arguments a definition controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArgDefaults {
    pub ee_base_image: String,
    /// `None` selects the dynamic builder, built from the base stage
    pub ee_builder_image: Option<String>,
    pub galaxy_cli_collection_opts: Option<String>,
    pub galaxy_cli_role_opts: Option<String>,
}

impl Default for BuildArgDefaults {
    fn default() -> Self {
        Self {
            ee_base_image: DEFAULT_BASE_IMAGE.to_string(),
            ee_builder_image: None,
            galaxy_cli_collection_opts: None,
            galaxy_cli_role_opts: None,
        }
    }
}

/// An extra file (or glob of files) to stage into the build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalBuildFile {
    /// Absolute path, or glob relative to the definition file
    pub src: String,
    /// Directory under the build context subfolder
    pub dest: String,
}

/// A validated, normalized execution environment definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub version: SchemaVersion,
    /// Directory relative paths in the definition are resolved against
    pub reference_dir: PathBuf,
    pub build_arg_defaults: BuildArgDefaults,
    pub base_image: Option<ImageDescription>,
    pub builder_image: Option<ImageDescription>,
    pub dependencies: Dependencies,
    pub additional_build_steps: AdditionalBuildSteps,
    /// Resolved ansible config file
    pub ansible_config: Option<PathBuf>,
    pub additional_build_files: Vec<AdditionalBuildFile>,
}

impl Definition {
    /// Whether a dedicated builder image is used instead of the base stage
    pub fn has_builder_image(&self) -> bool {
        self.build_arg_defaults.ee_builder_image.is_some()
    }

    /// Steps for `section`, after version aliasing
    pub fn steps(&self, section: StepSection) -> &[String] {
        self.additional_build_steps.get(section)
    }

    /// Interpreter used by generated `RUN` steps
    pub fn python_path(&self) -> &str {
        self.dependencies
            .python_path
            .as_deref()
            .unwrap_or(DEFAULT_PYTHON_PATH)
    }
}

/// Read, parse and validate the definition file at `path`
pub fn load_definition(path: &Path, fs: &dyn FileSystem) -> Result<Definition, DefinitionError> {
    if !fs.is_file(path) {
        return Err(DefinitionError::NotFound(path.to_path_buf()));
    }

    let text = fs
        .read_to_string(path)
        .map_err(|e| DefinitionError::Parse(format!("{:#}", e)))?;
    let raw = parse_definition(&text)?;

    let reference_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    debug!("Validating definition {:?}", path);

    validate(&raw, &reference_dir, fs)
}

/// Parse YAML text into an untyped value; an empty document is an empty
/// mapping
pub fn parse_definition(text: &str) -> Result<Value, DefinitionError> {
    let raw: Value =
        serde_yaml::from_str(text).map_err(|e| DefinitionError::Parse(e.to_string()))?;

    Ok(match raw {
        Value::Null => Value::Mapping(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_load_missing_file() {
        let fs = MockFileSystem::new();
        let err = load_definition(Path::new("/mock/execution-environment.yml"), &fs).unwrap_err();
        assert!(matches!(err, DefinitionError::NotFound(_)));
    }

    #[test]
    fn test_load_syntax_error() {
        let fs = MockFileSystem::new();
        fs.add_file("ee.yml", "version: [1\n");

        let err = load_definition(Path::new("/mock/ee.yml"), &fs).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("An error occurred while parsing the definition file:"));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let fs = MockFileSystem::new();
        fs.add_file("ee.yml", "");

        let definition = load_definition(Path::new("/mock/ee.yml"), &fs).unwrap();
        assert_eq!(definition.version, SchemaVersion::V1);
        assert_eq!(definition.build_arg_defaults.ee_base_image, DEFAULT_BASE_IMAGE);
        assert_eq!(definition.reference_dir, PathBuf::from("/mock"));
    }

    #[test]
    fn test_load_resolves_dependencies_next_to_file() {
        let fs = MockFileSystem::new();
        fs.add_file("defs/ee.yml", "version: 1\ndependencies:\n  python: requirements.txt\n");
        fs.add_file("defs/requirements.txt", "requests\n");

        let definition = load_definition(Path::new("/mock/defs/ee.yml"), &fs).unwrap();
        assert_eq!(
            definition.dependencies.path(DependencyKind::Python),
            Some(Path::new("/mock/defs/requirements.txt"))
        );
        assert!(definition.dependencies.has_requirements());
    }

    #[test]
    fn test_python_path_default() {
        let fs = MockFileSystem::new();
        fs.add_file("ee.yml", "version: 2");

        let definition = load_definition(Path::new("/mock/ee.yml"), &fs).unwrap();
        assert_eq!(definition.python_path(), DEFAULT_PYTHON_PATH);
        assert!(!definition.has_builder_image());
    }
}
