//! Display provider trait

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::{ModeId, ProviderBase};

/// Contract every display provider implements
///
/// Only `base`, `update` and `display` are required. The capability methods
/// default to answers derived from [`ProviderBase`]: live priority comes from
/// configuration, live content is never reported, and every declared mode is
/// eligible during a live episode.
#[async_trait]
pub trait DisplayProvider: Send + Sync {
    /// Shared provider state
    fn base(&self) -> &ProviderBase;

    /// Refresh provider data
    ///
    /// Runs on the host's update pool, never on the render context. State
    /// read by `display` and `has_live_content` should only be replaced once
    /// the refresh has fully succeeded.
    async fn update(&self) -> Result<()>;

    /// Render `mode` onto the surface
    ///
    /// `force_clear` is true when the slot was just entered.
    async fn display(&self, mode: &str, force_clear: bool) -> Result<()>;

    /// Check the configuration slice; `false` refuses admission
    fn validate_config(&self) -> Result<bool> {
        Ok(true)
    }

    /// Release provider resources before the instance is dropped
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// How long each slot of this provider stays on screen
    fn display_duration(&self) -> Duration {
        self.base().display_duration()
    }

    /// How long the slot for `mode` stays on screen
    ///
    /// A `mode_durations` entry wins; otherwise [`Self::display_duration`].
    fn mode_duration(&self, mode: &str) -> Duration {
        self.base()
            .mode_override(mode)
            .unwrap_or_else(|| self.display_duration())
    }

    /// Whether this provider may preempt normal rotation
    fn has_live_priority(&self) -> bool {
        self.base().live_priority()
    }

    /// Whether the provider currently holds urgent content
    ///
    /// Polled every scheduler tick; must be a cheap field check.
    fn has_live_content(&self) -> bool {
        false
    }

    /// Modes to show while live, in declaration order
    fn live_modes(&self) -> Vec<ModeId> {
        self.base().display_modes().to_vec()
    }
}
