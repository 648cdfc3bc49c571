//! Main configuration structure and implementation

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CacheConfig, ExecutorConfig, PluginsConfig, RotationConfig};
use crate::plugin::{ProviderConfig, ProviderId};
use crate::utils::get_config_dir;

/// Configuration file looked for in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "slateboard.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Manifest discovery
    pub plugins: PluginsConfig,

    /// Render loop
    pub rotation: RotationConfig,

    /// Update pool
    pub executor: ExecutorConfig,

    /// Provider cache
    pub cache: CacheConfig,

    /// Per-provider configuration slices
    pub providers: HashMap<ProviderId, ProviderConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {path:?}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the first default location that exists,
    /// else the built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for candidate in Self::default_locations() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
        if let Ok(dir) = get_config_dir() {
            locations.push(dir.join("config.yaml"));
        }
        locations
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != "1.0" {
            return Err(anyhow!(
                "Unsupported configuration version: {}",
                self.version
            ));
        }

        self.rotation.validate()?;
        self.executor.validate()?;
        self.cache.validate()?;

        // Surface unexpandable directories early rather than at startup
        self.plugins.expanded_directories()?;

        Ok(())
    }

    /// Configuration slice for one provider
    pub fn provider(&self, id: &str) -> ProviderConfig {
        self.providers.get(id).cloned().unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            plugins: PluginsConfig::default(),
            rotation: RotationConfig::default(),
            executor: ExecutorConfig::default(),
            cache: CacheConfig::default(),
            providers: HashMap::new(),
        }
    }
}
