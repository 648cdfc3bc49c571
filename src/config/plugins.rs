//! Plugin discovery configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::expand_path;

/// Where provider manifests are discovered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directories scanned recursively for manifests; `~/` and `$VAR` are expanded
    pub plugin_directories: Vec<PathBuf>,

    /// Whether every discovered, enabled provider is loaded at startup
    pub auto_load: bool,
}

impl PluginsConfig {
    /// Plugin directories with `~/` and environment variables expanded
    pub fn expanded_directories(&self) -> Result<Vec<PathBuf>> {
        self.plugin_directories
            .iter()
            .map(|dir| expand_path(&dir.to_string_lossy()))
            .collect()
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            plugin_directories: vec![
                PathBuf::from("./plugins"),
                PathBuf::from("~/.config/slateboard/plugins"),
            ],
            auto_load: true,
        }
    }
}
