//! Shared provider state and configuration slice

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{DisplaySurface, ModeId, ProviderCache, ProviderId};

fn default_enabled() -> bool {
    true
}

/// Per-provider configuration slice
///
/// The well-known keys are typed; everything else a provider needs is kept in
/// `settings` and read through [`ProviderBase::setting`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether the provider takes part in rotation and updates
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Display duration in seconds for every mode of this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_duration: Option<u64>,

    /// Whether this provider may preempt normal rotation
    #[serde(default)]
    pub live_priority: bool,

    /// Per-mode display durations in seconds
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mode_durations: BTreeMap<ModeId, u64>,

    /// Provider-specific settings
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            display_duration: None,
            live_priority: false,
            mode_durations: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }
}

/// Everything a factory needs to construct a provider
#[derive(Clone)]
pub struct ProviderContext {
    /// Provider identifier
    pub provider_id: ProviderId,

    /// Modes declared by the manifest, in declaration order
    pub display_modes: Vec<ModeId>,

    /// Manifest default display duration
    pub default_duration: Duration,

    /// Read-only configuration slice for this provider
    pub config: ProviderConfig,

    /// Rendering surface handle
    pub surface: Arc<dyn DisplaySurface>,

    /// Key-value cache scoped to this provider
    pub cache: ProviderCache,
}

/// Common state every provider carries
///
/// The default capability answers of [`crate::DisplayProvider`] are derived
/// from this struct, so a provider that has no opinion on live priority or
/// durations never has to implement those methods.
#[derive(Clone)]
pub struct ProviderBase {
    id: ProviderId,
    display_modes: Vec<ModeId>,
    default_duration: Duration,
    config: ProviderConfig,
    surface: Arc<dyn DisplaySurface>,
    cache: ProviderCache,
}

impl ProviderBase {
    /// Build the base from a construction context
    pub fn new(context: ProviderContext) -> Self {
        Self {
            id: context.provider_id,
            display_modes: context.display_modes,
            default_duration: context.default_duration,
            config: context.config,
            surface: context.surface,
            cache: context.cache,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_modes(&self) -> &[ModeId] {
        &self.display_modes
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn surface(&self) -> &Arc<dyn DisplaySurface> {
        &self.surface
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    /// Configured live priority flag
    pub fn live_priority(&self) -> bool {
        self.config.live_priority
    }

    /// Provider-wide display duration: config override, else manifest default
    pub fn display_duration(&self) -> Duration {
        self.config
            .display_duration
            .map(Duration::from_secs)
            .unwrap_or(self.default_duration)
    }

    /// Configured duration for one mode, if the config names it
    pub fn mode_override(&self, mode: &str) -> Option<Duration> {
        self.config
            .mode_durations
            .get(mode)
            .map(|secs| Duration::from_secs(*secs))
    }

    /// Read a provider-specific setting
    pub fn setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.config.settings.get(key) {
            Some(value) => serde_yaml::from_value(value.clone())
                .map(Some)
                .map_err(|e| anyhow!("Invalid value for setting '{}' of {}: {}", key, self.id, e)),
            None => Ok(None),
        }
    }
}
