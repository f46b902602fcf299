use crate::config::RelayConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub default_level: tracing::Level,
    pub json_format: bool,
    pub show_thread_ids: bool,
    pub show_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: tracing::Level::INFO,
            json_format: false,
            show_thread_ids: false,
            show_targets: true,
        }
    }
}

impl LogConfig {
    /// Development configuration (verbose, human-readable)
    pub fn dev() -> Self {
        Self {
            default_level: tracing::Level::DEBUG,
            show_thread_ids: true,
            ..Default::default()
        }
    }

    pub fn from_relay_config(config: &RelayConfig) -> Self {
        let base = if config.verbose {
            Self::dev()
        } else {
            Self::default()
        };
        Self {
            json_format: config.json_logs,
            ..base
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "phonedrop_relay={level},phonedrop_core={level},axum::rejection=trace,warn",
                level = self.default_level
            ))
        })
    }

    pub fn init(self) -> Result<(), String> {
        let registry = tracing_subscriber::registry().with(self.env_filter());

        let result = if self.json_format {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(self.show_targets)
                        .with_thread_ids(self.show_thread_ids),
                )
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(self.show_targets)
                        .with_thread_ids(self.show_thread_ids),
                )
                .try_init()
        };
        result.map_err(|e| format!("Failed to initialize tracing: {}", e))
    }
}
