//! Definition validation errors

use super::image::ImageKey;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating an execution environment
/// definition
///
/// Every variant is fatal: the caller aborts before any file is staged.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The definition file does not exist
    #[error("Could not detect '{}' file in this directory.\nUse -f to specify a different location.", .0.display())]
    NotFound(PathBuf),

    /// The definition file is not valid YAML
    #[error("An error occurred while parsing the definition file:\n{0}")]
    Parse(String),

    /// The top-level document is not a mapping
    #[error("Definition must be a dictionary, not {0}")]
    NotAMapping(&'static str),

    /// `version` cannot be read as an integer
    #[error("Schema version not an integer: {0}")]
    VersionNotInteger(String),

    /// `version` is an integer outside the supported set
    #[error("Unsupported schema version: {0}")]
    UnsupportedVersion(i128),

    /// Structural mismatch against the closed schema of the selected version
    #[error("{message}")]
    Schema {
        message: String,
        /// Key path to the offending value, outermost key first
        path: Vec<String>,
    },

    /// A dependency file referenced by the definition is missing or is not
    /// a regular file
    #[error("Dependency file {} does not exist.", .0.display())]
    MissingDependency(PathBuf),

    /// The ansible config file referenced by the definition is missing or is
    /// not a regular file
    #[error("Ansible config file {} does not exist.", .0.display())]
    MissingAnsibleConfig(PathBuf),

    /// An image descriptor was given without a `name`
    #[error("'name' is a required field for '{0}'")]
    MissingImageName(ImageKey),

    /// An image reference has no `:tag` suffix
    #[error("Container image requires a tag: {0}")]
    MissingImageTag(String),
}

impl DefinitionError {
    /// Human-readable message, without the key path
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Structured path to the offending key, when one is known
    pub fn path(&self) -> Option<&[String]> {
        match self {
            DefinitionError::Schema { path, .. } if !path.is_empty() => Some(path),
            _ => None,
        }
    }

    /// Whether the error comes from the structural schema check rather than a
    /// semantic rule
    pub fn is_schema_error(&self) -> bool {
        matches!(self, DefinitionError::Schema { .. })
    }

    pub(crate) fn schema(message: impl Into<String>, path: Vec<String>) -> Self {
        DefinitionError::Schema {
            message: message.into(),
            path,
        }
    }
}
