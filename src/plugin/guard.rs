//! Guarded provider calls
//!
//! Every async call into provider code goes through [`guarded`], which bounds
//! it by a wall-clock budget and turns errors and panics into [`PluginError`]s.
//! Synchronous calls go through [`contained`], which only catches panics.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use super::{LifecycleResult, Operation, PluginError};

/// Run a provider call under a time budget, containing errors and panics
pub async fn guarded<F, T>(id: &str, operation: Operation, budget: Duration, call: F) -> LifecycleResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();

    match tokio::time::timeout(budget, call).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(PluginError::runtime(id, operation, &e)),
        Ok(Err(panic)) => Err(PluginError::ProviderRuntime {
            id: id.to_string(),
            operation,
            message: panic_message(panic.as_ref()),
        }),
        Err(_) => Err(PluginError::ProviderTimeout {
            id: id.to_string(),
            operation,
            budget,
        }),
    }
}

/// Run a synchronous provider call, containing panics
///
/// Capability queries and `validate_config` have no time budget; they are
/// expected to be field checks.
pub fn contained<F, T>(id: &str, operation: Operation, call: F) -> LifecycleResult<T>
where
    F: FnOnce() -> T,
{
    std::panic::catch_unwind(AssertUnwindSafe(call)).map_err(|panic| PluginError::ProviderRuntime {
        id: id.to_string(),
        operation,
        message: panic_message(panic.as_ref()),
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
