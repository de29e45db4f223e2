use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::Granularity;
use crate::error::ConfigError;

const CONFIG_FILE_CANDIDATES: [&str; 4] = ["cctray.toml", "cctray.json", "cctray.yaml", "cctray.yml"];

/// Configuration file structure for cctray.
///
/// Every setting has a default, and command-line flags override whatever the
/// file provides. Bucket and key are only checked when the object store is
/// actually used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub s3: ObjectStoreConfig,

    #[serde(default)]
    pub file: FileConfig,

    #[serde(default)]
    pub cycle: CycleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeedConfig {
    /// One feed entry per pipeline or per pipeline stage
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceConfig {
    /// JSON document with the current pipeline snapshots
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObjectStoreConfig {
    /// S3-compatible endpoint, path-style addressing
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    pub bucket: Option<String>,

    pub key: Option<String>,

    /// Bearer token sent with uploads
    pub token: Option<String>,

    /// Make the uploaded feed publicly readable
    #[serde(default = "default_true")]
    pub public_read: bool,

    #[serde(default = "default_put_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CycleConfig {
    /// Overall budget for fetch, aggregate and persist
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Skip the persist if less than this is left of the deadline
    #[serde(default = "default_persist_reserve_secs")]
    pub persist_reserve_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            bucket: None,
            key: None,
            token: None,
            public_read: true,
            timeout_secs: default_put_timeout_secs(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            persist_reserve_secs: default_persist_reserve_secs(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("pipeline-state.json")
}

fn default_endpoint() -> String {
    "https://s3.amazonaws.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_put_timeout_secs() -> u64 {
    15
}

fn default_deadline_secs() -> u64 {
    25
}

fn default_persist_reserve_secs() -> u64 {
    5
}

impl ObjectStoreConfig {
    /// Returns the bucket and key, both of which must be set and non-empty.
    pub fn address(&self) -> std::result::Result<(String, String), ConfigError> {
        let bucket = non_empty(self.bucket.as_deref()).ok_or(ConfigError::Missing("s3.bucket (BUCKET)"))?;
        let key = non_empty(self.key.as_deref()).ok_or(ConfigError::Missing("s3.key (KEY)"))?;
        Ok((bucket.to_string(), key.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CycleConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn persist_reserve(&self) -> Duration {
        Duration::from_secs(self.persist_reserve_secs)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.deadline_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "cycle.deadline-secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.persist_reserve_secs >= self.deadline_secs {
            return Err(ConfigError::Invalid {
                name: "cycle.persist-reserve-secs",
                reason: format!(
                    "{} leaves no time within the {}s deadline",
                    self.persist_reserve_secs, self.deadline_secs
                ),
            });
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./cctray.toml, ./cctray.json, ./cctray.yaml, ./cctray.yml
    /// 3. `<config dir>/cctray/cctray.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        for candidate in &CONFIG_FILE_CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = dirs::config_dir().map(|dir| dir.join("cctray").join("cctray.toml")) {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}
