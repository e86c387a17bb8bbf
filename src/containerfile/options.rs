//! Build-time options that are not part of the definition

use super::constants::{DEFAULT_BUILD_CONTEXT, USER_CONTENT_SUBFOLDER};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Container runtime the build file is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerRuntime {
    #[default]
    Podman,
    Docker,
}

impl ContainerRuntime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRuntime::Podman => "podman",
            ContainerRuntime::Docker => "docker",
        }
    }

    /// Conventional build file name for this runtime
    pub fn containerfile_name(&self) -> &'static str {
        match self {
            ContainerRuntime::Podman => "Containerfile",
            ContainerRuntime::Docker => "Dockerfile",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "podman" => Ok(ContainerRuntime::Podman),
            "docker" => Ok(ContainerRuntime::Docker),
            other => Err(format!(
                "Invalid container runtime: {}. Valid options: podman, docker",
                other
            )),
        }
    }
}

/// Options steering compilation and build context staging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub container_runtime: ContainerRuntime,
    /// Overrides the runtime's conventional build file name
    pub output_filename: Option<String>,
    /// Directory the build file and staged content are written to
    pub build_context: PathBuf,
    /// GPG keyring used to verify collection signatures
    pub galaxy_keyring: Option<PathBuf>,
    /// Number of valid signatures required per collection; a leading `+`
    /// also rejects unsigned collections
    pub galaxy_required_valid_signature_count: Option<String>,
    /// GPG status codes ignored during collection verification, in order
    pub galaxy_ignore_signature_status_codes: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            container_runtime: ContainerRuntime::default(),
            output_filename: None,
            build_context: PathBuf::from(DEFAULT_BUILD_CONTEXT),
            galaxy_keyring: None,
            galaxy_required_valid_signature_count: None,
            galaxy_ignore_signature_status_codes: Vec::new(),
        }
    }
}

impl BuildOptions {
    pub fn new(build_context: impl Into<PathBuf>) -> Self {
        Self {
            build_context: build_context.into(),
            ..Default::default()
        }
    }

    pub fn with_runtime(mut self, runtime: ContainerRuntime) -> Self {
        self.container_runtime = runtime;
        self
    }

    pub fn with_keyring(mut self, keyring: impl Into<PathBuf>) -> Self {
        self.galaxy_keyring = Some(keyring.into());
        self
    }

    /// Name of the build file inside the build context
    pub fn containerfile_name(&self) -> &str {
        self.output_filename
            .as_deref()
            .unwrap_or_else(|| self.container_runtime.containerfile_name())
    }

    pub fn containerfile_path(&self) -> PathBuf {
        self.build_context.join(self.containerfile_name())
    }

    /// Directory staged content is copied into
    pub fn outputs_dir(&self) -> PathBuf {
        self.build_context.join(USER_CONTENT_SUBFOLDER)
    }
}
