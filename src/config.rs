//! Configuration loading.
//!
//! Settings are read from a TOML file:
//!
//! ```toml
//! [attributes]
//! ttl_secs = 300
//! memoize = true
//!
//! [memory_store]
//! max_entries = 10000
//! ```
//!
//! Every section and key is optional; missing values take the defaults
//! shown above.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::store::StoreConfig;
use crate::{CachetError, Result};

/// Cachet configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub attributes: AttributeDefaults,
    #[serde(default)]
    pub memory_store: StoreConfig,
}

/// Defaults applied to attributes via
/// [`AttributeBuilder::defaults`](crate::AttributeBuilder::defaults).
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDefaults {
    /// Store entry time-to-live in seconds (default: 300).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Whether attributes memoize into the instance (default: true).
    #[serde(default = "default_memoize")]
    pub memoize: bool,
}

impl AttributeDefaults {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for AttributeDefaults {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            memoize: default_memoize(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_memoize() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CachetError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            CachetError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CachetError::Configuration(format!("Failed to parse config: {e}")))
    }
}
