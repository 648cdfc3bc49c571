//! Traits tests

use super::*;
use crate::{MemorySurface, ProviderBase, ProviderCache, ProviderConfig, ProviderContext};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

struct Banner {
    base: ProviderBase,
}

#[async_trait]
impl DisplayProvider for Banner {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn update(&self) -> Result<()> {
        Ok(())
    }

    async fn display(&self, mode: &str, force_clear: bool) -> Result<()> {
        let surface = self.base.surface();
        if force_clear {
            surface.clear()?;
        }
        surface.draw_text(0, 0, mode)?;
        surface.present()
    }
}

struct BannerFactory;

#[async_trait]
impl ProviderFactory for BannerFactory {
    fn class_name(&self) -> &str {
        "Banner"
    }

    async fn create_provider(&self, context: ProviderContext) -> Result<Box<dyn DisplayProvider>> {
        Ok(Box::new(Banner {
            base: ProviderBase::new(context),
        }))
    }
}

fn context(config: ProviderConfig, surface: Arc<MemorySurface>) -> ProviderContext {
    ProviderContext {
        provider_id: "banner".to_string(),
        display_modes: vec!["headline".to_string(), "ticker".to_string()],
        default_duration: Duration::from_secs(12),
        config,
        surface,
        cache: ProviderCache::new(8, Duration::from_secs(60)).scoped("banner"),
    }
}

#[tokio::test]
async fn test_default_capabilities() {
    let surface = Arc::new(MemorySurface::new(64, 32));
    let provider = BannerFactory
        .create_provider(context(ProviderConfig::default(), surface.clone()))
        .await
        .unwrap();

    assert!(provider.validate_config().unwrap());
    assert!(!provider.has_live_priority());
    assert!(!provider.has_live_content());
    assert_eq!(provider.live_modes(), vec!["headline", "ticker"]);
    assert_eq!(provider.display_duration(), Duration::from_secs(12));
    assert_eq!(provider.mode_duration("ticker"), Duration::from_secs(12));
    provider.cleanup().await.unwrap();

    provider.display("ticker", true).await.unwrap();
    assert_eq!(surface.last_frame().unwrap().text(), "ticker");
}

#[tokio::test]
async fn test_live_priority_comes_from_config() {
    let mut config = ProviderConfig::default();
    config.live_priority = true;
    config.mode_durations.insert("ticker".to_string(), 4);

    let surface = Arc::new(MemorySurface::new(64, 32));
    let provider = BannerFactory
        .create_provider(context(config, surface))
        .await
        .unwrap();

    assert!(provider.has_live_priority());
    assert_eq!(provider.mode_duration("ticker"), Duration::from_secs(4));
    assert_eq!(provider.mode_duration("headline"), Duration::from_secs(12));
}

/// Fixed-length slots regardless of configuration
struct Marquee {
    base: ProviderBase,
}

#[async_trait]
impl DisplayProvider for Marquee {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn update(&self) -> Result<()> {
        Ok(())
    }

    async fn display(&self, _mode: &str, _force_clear: bool) -> Result<()> {
        Ok(())
    }

    fn display_duration(&self) -> Duration {
        Duration::from_secs(3)
    }
}

#[test]
fn test_mode_duration_uses_overridden_display_duration() {
    let mut config = ProviderConfig::default();
    config.mode_durations.insert("ticker".to_string(), 8);

    let provider = Marquee {
        base: ProviderBase::new(context(config, Arc::new(MemorySurface::new(64, 32)))),
    };

    assert_eq!(provider.mode_duration("headline"), Duration::from_secs(3));
    assert_eq!(provider.mode_duration("ticker"), Duration::from_secs(8));
}
