//! Rotation, update executor and cache settings

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Render loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Scheduler tick period
    pub tick_interval_ms: u64,

    /// Slot duration used when a provider reports a zero duration
    pub fallback_duration_seconds: u64,
}

impl RotationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn fallback_duration(&self) -> Duration {
        Duration::from_secs(self.fallback_duration_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(anyhow!("rotation.tick_interval_ms must be greater than zero"));
        }
        if self.fallback_duration_seconds == 0 {
            return Err(anyhow!(
                "rotation.fallback_duration_seconds must be greater than zero"
            ));
        }
        Ok(())
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            fallback_duration_seconds: 15,
        }
    }
}

/// Update executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Size of the update pool
    pub max_concurrent_updates: usize,

    /// Budget for one `update()` call; also bounds construction and cleanup
    pub update_timeout_seconds: u64,

    /// Budget for one `display()` call
    pub display_timeout_seconds: u64,

    /// How often due updates are looked for
    pub poll_interval_ms: u64,
}

impl ExecutorConfig {
    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_seconds)
    }

    pub fn display_timeout(&self) -> Duration {
        Duration::from_secs(self.display_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_updates == 0 {
            return Err(anyhow!("executor.max_concurrent_updates must be greater than zero"));
        }
        if self.update_timeout_seconds == 0 || self.display_timeout_seconds == 0 {
            return Err(anyhow!("executor timeouts must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("executor.poll_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_updates: 4,
            update_timeout_seconds: 30,
            display_timeout_seconds: 2,
            poll_interval_ms: 500,
        }
    }
}

/// Provider cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,

    /// Upper bound on the lifetime of any cache entry
    pub default_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 || self.default_ttl_seconds == 0 {
            return Err(anyhow!("cache.max_entries and cache.default_ttl_seconds must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            default_ttl_seconds: 300,
        }
    }
}
