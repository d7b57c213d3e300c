//! Logging configuration and subscriber setup.
//!
//! dq-guard emits structured `tracing` events; this module decides how chatty the
//! engine is and offers a ready-made subscriber for binaries.

use tracing::Level;

/// Logging configuration for the engine.
///
/// Per-expectation and data-source logs can be switched off to keep large
/// checkpoints quiet in production.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for dq-guard components
    pub base_level: Level,
    /// Whether to log every passing expectation
    pub log_expectation_details: bool,
    /// Whether to log batch fetches
    pub log_data_operations: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_expectation_details: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_expectation_details: true,
            log_data_operations: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_expectation_details: false,
            log_data_operations: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Macro for conditional expectation logging.
#[macro_export]
macro_rules! log_expectation {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_expectation_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional data operation logging.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
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

/// Subscriber setup for binaries and tests.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything else
        pub level: Level,
        /// Log level for dq-guard components specifically
        pub guard_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                guard_level: Level::DEBUG,
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
                guard_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                guard_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_guard_level(mut self, level: Level) -> Self {
            self.guard_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},dq_guard={},dq_checkpoint={}",
                    self.level.as_str().to_lowercase(),
                    self.guard_level.as_str().to_lowercase(),
                    self.guard_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber. `RUST_LOG` takes precedence over the config.
    ///
    /// ```rust,no_run
    /// use dq_guard::logging::setup::{init_logging, LoggingConfig};
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

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_expectation_details);
        assert!(config.log_data_operations);

        let verbose = LogConfig::verbose();
        assert!(verbose.log_expectation_details);
        assert_eq!(verbose.max_field_length, 1024);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_data_operations);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text", 10),
            "this is a ...(truncated)"
        );
        assert_eq!(truncate_field("héllo", 2), "h...(truncated)");
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(
            LoggingConfig::default().env_filter(),
            "info,dq_guard=debug,dq_checkpoint=debug"
        );
        assert_eq!(
            LoggingConfig::production()
                .with_env_filter("dq_guard=trace")
                .env_filter(),
            "dq_guard=trace"
        );
    }
}
