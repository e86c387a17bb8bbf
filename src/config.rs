//! Configuration for ee-builder
//!
//! Settings are read from environment variables with fallback defaults.
//! Command line flags override anything configured here.
//!
//! # Environment Variables
//!
//! - `EE_BUILDER_CONTAINER_RUNTIME`: Container runtime (podman|docker) - default: "podman"
//! - `EE_BUILDER_CONTEXT`: Build context directory - default: "context"
//! - `EE_BUILDER_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use ee_builder::BuilderConfig;
//!
//! let config = BuilderConfig::default();
//! config.validate().expect("Invalid configuration");
//! let runtime = config.runtime().expect("Invalid container runtime");
//! println!("{} builds with {}", config, runtime);
//! ```

use crate::containerfile::{constants::DEFAULT_BUILD_CONTEXT, ContainerRuntime};
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_CONTAINER_RUNTIME: &str = "EE_BUILDER_CONTAINER_RUNTIME";
pub const ENV_CONTEXT: &str = "EE_BUILDER_CONTEXT";
pub const ENV_LOG_LEVEL: &str = "EE_BUILDER_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid container runtime: {0}. Valid options: podman, docker")]
    InvalidRuntime(String),

    #[error("Invalid log level: {0}. Valid options: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Container runtime name, as configured
    pub container_runtime: String,

    /// Directory the build context is written to
    pub build_context: PathBuf,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for BuilderConfig {
    /// Loads configuration from `EE_BUILDER_*` variables with defaults
    fn default() -> Self {
        let container_runtime = env::var(ENV_CONTAINER_RUNTIME)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| ContainerRuntime::default().to_string())
            .to_lowercase();

        let build_context = env::var(ENV_CONTEXT)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_CONTEXT));

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            container_runtime,
            build_context,
            log_level,
        }
    }
}

impl BuilderConfig {
    /// Checks the log level and build context.
    ///
    /// The runtime is checked by [`runtime`](Self::runtime) when it is used,
    /// since a command line flag may replace it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(ConfigError::InvalidLogLevel(self.log_level.clone())),
        }

        if self.build_context.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Build context directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured container runtime
    pub fn runtime(&self) -> Result<ContainerRuntime, ConfigError> {
        self.container_runtime
            .parse()
            .map_err(|_| ConfigError::InvalidRuntime(self.container_runtime.clone()))
    }
}

impl fmt::Display for BuilderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ee-builder Configuration:")?;
        writeln!(f, "  Container Runtime: {}", self.container_runtime)?;
        writeln!(f, "  Build Context: {}", self.build_context.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
