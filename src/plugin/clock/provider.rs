//! Clock provider implementation

use anyhow::Result;
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use tokio::sync::RwLock;

use crate::plugin::*;

const DEFAULT_FORMAT: &str = "%H:%M";

/// Renders the local time using a strftime format from the `format` setting
pub struct ClockProvider {
    base: ProviderBase,

    format: String,

    /// Time text captured by the last update
    current: RwLock<Option<String>>,
}

impl ClockProvider {
    pub const CLASS_NAME: &'static str = "ClockProvider";

    pub fn new(context: ProviderContext) -> Result<Self> {
        let base = ProviderBase::new(context);
        let format = base
            .setting::<String>("format")?
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        Ok(Self {
            base,
            format,
            current: RwLock::new(None),
        })
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }
}

#[async_trait]
impl DisplayProvider for ClockProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn update(&self) -> Result<()> {
        let text = Local::now().format(&self.format).to_string();
        *self.current.write().await = Some(text);
        Ok(())
    }

    async fn display(&self, _mode: &str, _force_clear: bool) -> Result<()> {
        let surface = self.base.surface();
        let text = self
            .current
            .read()
            .await
            .clone()
            .unwrap_or_else(|| "--:--".to_string());

        // The whole frame is redrawn every time
        surface.clear()?;
        surface.draw_text(0, 0, &text)?;
        surface.present()
    }

    fn validate_config(&self) -> Result<bool> {
        Ok(!StrftimeItems::new(&self.format).any(|item| matches!(item, Item::Error)))
    }
}
