//! Logging setup for applications that send mail with Courier
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber. Defaults to JSON output to STDOUT at INFO, and `RUST_LOG`
//! overrides the configured level when set.
//!
//! # Examples
//!
//! ```no_run
//! use courier::logging::*;
//!
//! let _guard = LogConfig::default().init()?;
//! info!("Mailer starting");
//! # Ok::<(), LogError>(())
//! ```
//!
//! ## From configuration
//!
//! ```no_run
//! use courier::config::ConfigManager;
//! use courier::logging::*;
//!
//! // log.level = "debug", log.format = "pretty", log.file = "courier.log"
//! let config = ConfigManager::builder().with_prefix("COURIER").load_env().build()?;
//! let _guard = LogConfig::from_config(&config)?.init()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use courier_config::ConfigManager;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing::{debug, error, info, trace, warn};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid log setting: {0}")]
    InvalidValue(String),

    #[error("Logging already initialized: {0}")]
    Init(String),

    #[error(transparent)]
    Config(#[from] courier_config::ConfigError),
}

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(LogError::InvalidValue(format!("log level '{}'", other))),
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Structured, machine-readable
    #[default]
    Json,
    /// Multi-line, for development
    Pretty,
    /// One short line per event
    Compact,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(LogError::InvalidValue(format!("log format '{}'", other))),
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to a single file
    File(PathBuf),
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include target (module path)
    pub targets: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Enable ANSI colors (ignored for JSON)
    pub colors: bool,
    /// Custom filter such as `courier_mail=debug,lettre=warn`; overrides level
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `log.level`, `log.format` and `log.file` (stdout when unset).
    pub fn from_config(config: &ConfigManager) -> Result<Self, LogError> {
        let mut log = Self::default();

        if let Some(level) = config.get_opt::<String>("log.level")? {
            log.level = level.parse()?;
        }
        if let Some(format) = config.get_opt::<String>("log.format")? {
            log.format = format.parse()?;
        }
        if let Some(path) = config.get_opt::<PathBuf>("log.file")? {
            log.output = LogOutput::File(path);
        }
        log.env_filter = config.get_opt("log.filter")?;

        Ok(log)
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter built from the explicit filter, then `RUST_LOG`, then the level.
    fn filter(&self) -> Result<EnvFilter, LogError> {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|e| LogError::InvalidValue(format!("filter '{}': {}", directives, e))),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))),
        }
    }

    fn writer(&self) -> Result<(NonBlocking, WorkerGuard), LogError> {
        Ok(match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LogError::File {
                        path: path.clone(),
                        source,
                    })?;
                tracing_appender::non_blocking(file)
            }
        })
    }

    fn layer(&self, writer: NonBlocking) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(writer)
            .with_target(self.targets)
            .with_thread_ids(self.thread_ids);

        match self.format {
            LogFormat::Json => base.json().boxed(),
            LogFormat::Pretty => base.pretty().with_ansi(self.colors).boxed(),
            LogFormat::Compact => base.compact().with_ansi(self.colors).boxed(),
        }
    }

    /// Install the global subscriber.
    ///
    /// Keep the returned guard alive for the life of the program; dropping it
    /// flushes buffered events.
    pub fn init(self) -> Result<WorkerGuard, LogError> {
        let filter = self.filter()?;
        let (writer, guard) = self.writer()?;

        tracing_subscriber::registry()
            .with(self.layer(writer))
            .with(filter)
            .try_init()
            .map_err(|e| LogError::Init(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for LogConfig {
    /// JSON to STDOUT at INFO
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            thread_ids: false,
            colors: false,
            env_filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_directive() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!("loud".parse::<LogLevel>(), Err(LogError::InvalidValue(_))));
        assert!(matches!("xml".parse::<LogFormat>(), Err(LogError::InvalidValue(_))));
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stdout);
        assert!(config.targets);
    }

    #[test]
    fn test_from_config() {
        let config = ConfigManager::new();
        config.set("log.level", "debug").unwrap();
        config.set("log.format", "compact").unwrap();
        config.set("log.file", "/tmp/courier.log").unwrap();

        let log = LogConfig::from_config(&config).unwrap();
        assert_eq!(log.level, LogLevel::Debug);
        assert_eq!(log.format, LogFormat::Compact);
        assert_eq!(log.output, LogOutput::File(PathBuf::from("/tmp/courier.log")));
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LogConfig::new().with_env_filter("courier_mail=loudest");
        assert!(matches!(config.filter(), Err(LogError::InvalidValue(_))));
    }

    #[test]
    fn test_unwritable_file_is_reported() {
        let config = LogConfig::new().output(LogOutput::File(PathBuf::from(
            "/nonexistent-dir/courier.log",
        )));
        assert!(matches!(config.writer(), Err(LogError::File { .. })));
    }
}
