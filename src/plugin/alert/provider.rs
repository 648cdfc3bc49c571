//! Alert provider implementation
//!
//! `update` reads the file named by the `trigger_file` setting. While it holds
//! non-empty text the provider reports live content, and with `live_priority`
//! configured it takes over the surface. The last message is kept in the host
//! cache so it can still be shown after the alert clears.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::plugin::*;
use crate::utils::expand_path;

const LAST_MESSAGE_KEY: &str = "last_message";

/// How long a cleared alert stays available as "last message"
const DEFAULT_RECALL_SECS: u64 = 3600;

pub struct AlertProvider {
    base: ProviderBase,

    trigger_file: Option<PathBuf>,

    recall: Duration,

    /// Live flag, polled every scheduler tick
    live: AtomicBool,

    message: RwLock<Option<String>>,
}

impl AlertProvider {
    pub const CLASS_NAME: &'static str = "AlertProvider";

    pub fn new(context: ProviderContext) -> Result<Self> {
        let base = ProviderBase::new(context);

        let trigger_file = base
            .setting::<String>("trigger_file")?
            .map(|path| expand_path(&path))
            .transpose()?;
        let recall = base
            .setting::<u64>("recall_seconds")?
            .unwrap_or(DEFAULT_RECALL_SECS);

        Ok(Self {
            base,
            trigger_file,
            recall: Duration::from_secs(recall),
            live: AtomicBool::new(false),
            message: RwLock::new(None),
        })
    }

    pub async fn message(&self) -> Option<String> {
        self.message.read().await.clone()
    }

    async fn read_trigger(&self) -> Result<Option<String>> {
        let Some(path) = &self.trigger_file else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let text = content.trim();
                Ok((!text.is_empty()).then(|| text.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read trigger file {path:?}")),
        }
    }
}

#[async_trait]
impl DisplayProvider for AlertProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn update(&self) -> Result<()> {
        let message = self.read_trigger().await?;

        if let Some(text) = &message {
            self.base.cache().set(LAST_MESSAGE_KEY, text)?;
        }

        let was_live = self.live.swap(message.is_some(), Ordering::SeqCst);
        match (was_live, &message) {
            (false, Some(text)) => info!("Alert raised: {}", text),
            (true, None) => info!("Alert cleared"),
            _ => debug!("Alert state unchanged"),
        }

        *self.message.write().await = message;
        Ok(())
    }

    async fn display(&self, _mode: &str, force_clear: bool) -> Result<()> {
        let surface = self.base.surface();
        if force_clear {
            surface.clear()?;
        }

        match self.message.read().await.as_deref() {
            Some(text) => {
                surface.draw_text(0, 0, "ALERT")?;
                surface.draw_text(0, 16, text)?;
            }
            None => match self
                .base
                .cache()
                .get::<String>(LAST_MESSAGE_KEY, Some(self.recall))
            {
                Some(last) => surface.draw_text(0, 0, &format!("Last alert: {last}"))?,
                None => surface.draw_text(0, 0, "No alerts")?,
            },
        }

        surface.present()
    }

    fn validate_config(&self) -> Result<bool> {
        Ok(self.trigger_file.is_some())
    }

    async fn cleanup(&self) -> Result<()> {
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn has_live_content(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
