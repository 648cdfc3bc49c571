//! Lifecycle and provider error taxonomy

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::ProviderId;

/// Provider call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Construct,
    Validate,
    Update,
    Display,
    Cleanup,
    /// Capability queries made while building the rotation snapshot
    Poll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Construct => "construct",
            Operation::Validate => "validate",
            Operation::Update => "update",
            Operation::Display => "display",
            Operation::Cleanup => "cleanup",
            Operation::Poll => "poll",
        };
        f.write_str(name)
    }
}

/// Errors raised by the lifecycle manager and by contained provider calls
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("Invalid manifest {path:?}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("No manifest discovered for provider: {0}")]
    ManifestNotFound(ProviderId),

    #[error("Provider {id} requires {required}, host provides {current}")]
    VersionIncompatible {
        id: ProviderId,
        required: String,
        current: String,
    },

    #[error("No factory registered for class {class_name} (entry point {entry_point}) of provider {id}")]
    EntryPointUnresolved {
        id: ProviderId,
        entry_point: String,
        class_name: String,
    },

    #[error("Configuration rejected for provider {id}: {reason}")]
    ConfigInvalid { id: ProviderId, reason: String },

    #[error("Provider {id} failed during {operation}: {message}")]
    ProviderRuntime {
        id: ProviderId,
        operation: Operation,
        message: String,
    },

    #[error("Provider {id} exceeded {budget:?} during {operation}")]
    ProviderTimeout {
        id: ProviderId,
        operation: Operation,
        budget: Duration,
    },
}

impl PluginError {
    pub fn invalid_manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PluginError::ManifestInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn runtime(id: &str, operation: Operation, error: &anyhow::Error) -> Self {
        PluginError::ProviderRuntime {
            id: id.to_string(),
            operation,
            message: format!("{error:#}"),
        }
    }

    /// Whether the error came from a loaded provider rather than admission
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            PluginError::ProviderRuntime { .. } | PluginError::ProviderTimeout { .. }
        )
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, PluginError>;
