//! Session and per-type configuration.
//!
//! Configuration can be built in code or loaded from YAML:
//!
//! ```yaml
//! default_by: css
//! default_timeout_ms: 5000
//! poll_interval_ms: 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::locator::{By, Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{PageError, PageResult};

/// Defaults applied to every scope in a session unless the component type
/// overrides them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Strategy for fields that declare none
    pub default_by: By,
    /// Lookup and wait timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Delay between poll attempts in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_by: By::Css,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default location strategy
    #[must_use]
    pub const fn with_default_by(mut self, by: By) -> Self {
        self.default_by = by;
        self
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> PageResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| PageError::ConfigError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> PageResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject settings that would make polling spin
    pub fn validate(&self) -> PageResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(PageError::ConfigError {
                message: "poll_interval_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-type overrides, applied to a declaration with
/// [`DeclarationBuilder::configure`](crate::DeclarationBuilder::configure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeConfig {
    /// Strategy for this type's fields that declare none
    pub default_by: Option<By>,
    /// Lookup timeout for scopes of this type
    pub default_timeout_ms: Option<u64>,
    /// Row container locator when the type is a table row
    pub row_locator: Option<Locator>,
}

impl TypeConfig {
    /// Parse from YAML
    pub fn from_yaml_str(yaml: &str) -> PageResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| PageError::ConfigError {
            message: e.to_string(),
        })
    }
}
