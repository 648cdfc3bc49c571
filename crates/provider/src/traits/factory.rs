//! Provider factory trait

use anyhow::Result;
use async_trait::async_trait;

use crate::{DisplayProvider, ProviderContext};

/// Constructs provider instances for one implementation class
///
/// Manifests name a `class_name`; the host resolves it against the factories
/// registered with it.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Class name this factory answers to
    fn class_name(&self) -> &str;

    /// Create a new provider instance
    async fn create_provider(&self, context: ProviderContext) -> Result<Box<dyn DisplayProvider>>;
}
