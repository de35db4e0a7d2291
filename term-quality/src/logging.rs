//! Logging configuration for the quality engine.
//!
//! Validators, backends and the runner emit `tracing` events with dotted field
//! names (`test_case.name`, `metric.name`, `backend.kind`, `result.status`).
//! [`LogConfig`] gates the chattier events, [`setup`] installs a subscriber.

use tracing::Level;

/// Verbosity knobs consulted by the engine while it runs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Most verbose level the gated macros emit at
    pub base_level: Level,
    /// Whether to log every validator state transition
    pub log_validation_details: bool,
    /// Whether to log the SQL and row counts of backend operations
    pub log_backend_operations: bool,
    /// Whether to include computed metric values in log output
    pub log_metric_values: bool,
    /// Maximum length for logged field values
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_validation_details: false,
            log_backend_operations: true,
            log_metric_values: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_validation_details: true,
            log_backend_operations: true,
            log_metric_values: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_validation_details: false,
            log_backend_operations: false,
            log_metric_values: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Whether events at `level` pass `base_level`.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.base_level
    }
}

/// Debug event that is only formatted when validation details are enabled
/// and `base_level` admits debug events.
#[macro_export]
macro_rules! log_validation {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_validation_details && $config.enabled(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Debug event for backend operations, gated by `log_backend_operations`
/// and `base_level`.
#[macro_export]
macro_rules! log_backend_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_backend_operations && $config.enabled(tracing::Level::DEBUG) {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, respecting char boundaries.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for binaries and tests that embed the engine.
pub mod setup {
    use tracing::Level;

    /// Configuration for the tracing subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for `term_quality` specifically
        pub engine_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                engine_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                engine_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                engine_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for engine components.
        pub fn with_engine_level(mut self, level: Level) -> Self {
            self.engine_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            match self.env_filter {
                Some(ref filter) => filter.clone(),
                None => format!(
                    "{},term_quality={}",
                    self.level.as_str().to_lowercase(),
                    self.engine_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_quality::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}
