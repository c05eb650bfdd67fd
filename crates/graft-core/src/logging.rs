//! Structured logging configuration for the provider framework.
//!
//! Hosts and providers log through the `tracing` crate; this module sets up
//! a global subscriber with sensible defaults. A `RUST_LOG` filter in the
//! environment always wins over the configured level.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration for a host process.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Whether to include thread IDs.
    pub with_thread_ids: bool,
    /// Whether to log span enter/close events.
    pub with_span_events: bool,
    /// Whether to output in JSON format.
    pub json_format: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace-level logging (most verbose).
    Trace,
    /// Debug-level logging.
    Debug,
    /// Info-level logging.
    Info,
    /// Warn-level logging.
    Warn,
    /// Error-level logging (least verbose).
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_thread_ids: false,
            with_span_events: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable thread IDs.
    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.with_thread_ids = enable;
        self
    }

    /// Enable or disable span event logging.
    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.with_span_events = enable;
        self
    }

    /// Enable or disable JSON output format.
    pub fn with_json_format(mut self, enable: bool) -> Self {
        self.json_format = enable;
        self
    }

    /// Development-friendly configuration: debug level, thread IDs on.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            with_thread_ids: true,
            with_span_events: true,
            json_format: false,
        }
    }

    /// Production-friendly configuration: info level, JSON for aggregation.
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            with_thread_ids: false,
            with_span_events: false,
            json_format: true,
        }
    }
}

/// Initialize the global logger with the given configuration.
///
/// Call once at process start; later calls panic because the global
/// subscriber is already set.
pub fn init_logging(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_tracing_level().as_str()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.with_span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_current_span(true)
            .with_thread_ids(config.with_thread_ids);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(span_events)
            .with_thread_ids(config.with_thread_ids);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}

/// Initialize logging with default configuration.
pub fn init_default_logging() {
    init_logging(LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.with_thread_ids);
        assert!(!config.json_format);
    }

    #[test]
    fn test_logging_config_development() {
        let config = LoggingConfig::development();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.with_span_events);
        assert!(!config.json_format);
    }

    #[test]
    fn test_logging_config_production() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.json_format);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Trace)
            .with_thread_ids(true)
            .with_json_format(true);

        assert_eq!(config.level, LogLevel::Trace);
        assert!(config.with_thread_ids);
        assert!(config.json_format);
    }
}
