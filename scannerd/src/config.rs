//! Configuration for scannerd.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::feed::FEED_INFO_FILE;
use crate::prefs::{PrefValue, Preferences};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    /// Scanner preferences seeded into the preference store at startup.
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds the liveness probe waits for the peer before treating a
    /// quiet connection as alive.
    pub probe_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 2,
        }
    }
}

impl SessionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe_timeout_secs",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Directory holding the loaded check feed.
    pub dir: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/lib/scannerd/plugins"),
        }
    }
}

impl FeedConfig {
    /// Path of the feed info file carrying the PLUGIN_SET build tag.
    pub fn info_file(&self) -> PathBuf {
        self.dir.join(FEED_INFO_FILE)
    }
}

fn default_address() -> String {
    "127.0.0.1:9390".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        Ok(config)
    }

    /// Builds the preference store from the `[preferences]` table.
    pub fn build_preferences(&self) -> Preferences {
        let mut prefs = Preferences::new();
        for (key, value) in &self.preferences {
            prefs.set(key.clone(), PrefValue::Text(value.clone()));
        }
        prefs
    }
}
