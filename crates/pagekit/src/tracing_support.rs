//! Log output for test runs.
//!
//! pagekit emits `tracing` events (element resolution at `debug`, transitions
//! at `info`, ignored timeouts at `warn`). Test binaries call [`init_tracing`]
//! once to see them; `RUST_LOG` overrides the configured filter.

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Configuration for tracing output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "pagekit=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Effective filter: `RUST_LOG` first, then the configured directive
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }

    /// Install the global subscriber.
    ///
    /// Returns `false` when one is already installed, so every test may call
    /// it.
    pub fn init(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let installed = match self.format {
            LogFormat::Pretty => registry
                .with(tracing_subscriber::fmt::layer().with_test_writer())
                .try_init(),
            LogFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_test_writer()
                        .with_ansi(false),
                )
                .try_init(),
        };
        installed.is_ok()
    }
}

/// Install a pretty subscriber filtered by `RUST_LOG` or `filter`
pub fn init_tracing(filter: &str) -> bool {
    TracingConfig::new().with_filter(filter).init()
}
