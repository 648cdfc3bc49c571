//! Alert provider factory

use anyhow::Result;
use async_trait::async_trait;

use super::provider::AlertProvider;
use crate::plugin::*;

/// Alert provider factory
pub struct AlertProviderFactory;

#[async_trait]
impl ProviderFactory for AlertProviderFactory {
    fn class_name(&self) -> &str {
        AlertProvider::CLASS_NAME
    }

    async fn create_provider(&self, context: ProviderContext) -> Result<Box<dyn DisplayProvider>> {
        Ok(Box::new(AlertProvider::new(context)?))
    }
}
