//! Clock provider factory

use anyhow::Result;
use async_trait::async_trait;

use super::provider::ClockProvider;
use crate::plugin::*;

/// Clock provider factory
pub struct ClockProviderFactory;

#[async_trait]
impl ProviderFactory for ClockProviderFactory {
    fn class_name(&self) -> &str {
        ClockProvider::CLASS_NAME
    }

    async fn create_provider(&self, context: ProviderContext) -> Result<Box<dyn DisplayProvider>> {
        Ok(Box::new(ClockProvider::new(context)?))
    }
}
