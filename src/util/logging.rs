//! Logging setup for ee-builder
//!
//! Installs a `tracing` subscriber writing either human readable lines or
//! JSON to stderr. `RUST_LOG` is honoured on top of the configured level.
//! Initialization happens at most once per process.
//!
//! # Example
//!
//! ```no_run
//! use ee_builder::util::logging;
//! use tracing::{debug, info};
//!
//! logging::init_from_env();
//!
//! info!("Staging build context");
//! debug!(file = "requirements.txt", "Copied dependency file");
//! ```

use crate::config::ENV_LOG_LEVEL;
use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LOG_JSON: &str = "EE_BUILDER_LOG_JSON";

static INIT: Once = Once::new();

/// Minimum level, output format and metadata of log lines
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format (for structured logging in production)
    pub use_json: bool,

    /// Include the module target (e.g., ee_builder::containerfile) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// INFO level, plain console output without targets
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// Creates a logging configuration with the specified level
    ///
    /// ```
    /// use ee_builder::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::with_level(Level::DEBUG);
    /// assert!(!config.use_json);
    /// ```
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parses a log level, case-insensitively, falling back to `INFO`
///
/// ```
/// use ee_builder::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("INFO"), Level::INFO);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Initializes the logging system; calls after the first are ignored
///
/// ```no_run
/// use ee_builder::util::{init_logging, LoggingConfig};
/// use tracing::Level;
///
/// init_logging(LoggingConfig::with_level(Level::DEBUG));
/// ```
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = crate_directive(config.level).parse() {
            filter = filter.add_directive(directive);
        }

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

/// Filter directive applying `level` to this crate's targets
fn crate_directive(level: Level) -> String {
    format!("ee_builder={}", level)
}

/// Initializes logging at INFO level
pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Builds a configuration from `EE_BUILDER_LOG_LEVEL` and
/// `EE_BUILDER_LOG_JSON`
pub fn config_from_env() -> LoggingConfig {
    let level_str = env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string());
    let level = parse_level(&level_str);

    let use_json = env::var(ENV_LOG_JSON)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        use_json,
        ..LoggingConfig::with_level(level)
    }
}

/// Initializes logging from `EE_BUILDER_LOG_LEVEL`, `EE_BUILDER_LOG_JSON`
/// and `RUST_LOG`
pub fn init_from_env() {
    init_logging(config_from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("invalid"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(!config.include_target);
        assert!(!config.include_location);
    }

    #[test]
    fn test_crate_directive_parses() {
        let directive = crate_directive(Level::WARN);
        assert_eq!(directive, "ee_builder=WARN");
        assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var(ENV_LOG_LEVEL, "debug");
        std::env::set_var(ENV_LOG_JSON, "true");

        let config = config_from_env();

        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_JSON);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_JSON);

        let config = config_from_env();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
    }
}
