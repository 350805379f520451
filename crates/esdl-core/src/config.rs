//! Configuration module

use crate::{Error, Result};
use dirs::config_dir;
use esdl_cloud::{StoreOptions, DEFAULT_BUCKET, DEFAULT_REGION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the archive lives and how to reach it
    #[serde(default)]
    pub store: StoreConfig,
    /// Download defaults
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Object-store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bucket listed when no location is given
    pub bucket: String,
    /// Region of the bucket
    pub region: Option<String>,
    /// S3-compatible endpoint other than AWS
    pub endpoint: Option<String>,
    /// Connect without credentials
    pub anonymous: bool,
    /// Permit plain http endpoints
    pub allow_http: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: Some(DEFAULT_REGION.to_string()),
            endpoint: None,
            anonymous: true,
            allow_http: false,
        }
    }
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory copies land in when no `--output` is given
    pub destination: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| Error::Config("Unable to determine config directory".to_string()))?;

        let esdl_dir = config_dir.join("esdl");
        if !esdl_dir.exists() {
            fs::create_dir_all(&esdl_dir)?;
        }

        Ok(esdl_dir.join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        format!(
            r#"# esdl configuration file

[store]
# Bucket listed by `esdl ls` when no location is given
bucket = "{bucket}"
# Region of the bucket
region = "{region}"
# S3-compatible endpoint, for archives mirrored outside AWS
# endpoint = "https://obs.example.com"
# Connect without credentials (the archive is public)
anonymous = true
# Permit plain http endpoints
allow_http = false

[download]
# Directory copies land in when no --output is given
destination = "."
"#,
            bucket = DEFAULT_BUCKET,
            region = DEFAULT_REGION,
        )
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing the commented default there first if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Store options described by the `[store]` section
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            anonymous: self.store.anonymous,
            region: self.store.region.clone(),
            endpoint: self.store.endpoint.clone(),
            allow_http: self.store.allow_http,
        }
    }
}
