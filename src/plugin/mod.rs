//! Provider lifecycle: manifests, version gating, the registry and the
//! built-in providers

pub mod alert;
pub mod clock;
pub mod compat;
pub mod error;
pub mod guard;
pub mod manifest;
pub mod registry;

pub use compat::*;
pub use error::*;
pub use guard::*;
pub use manifest::*;
pub use registry::*;

pub use slateboard_provider::{
    DisplayProvider, DisplaySurface, Frame, MemorySurface, ModeId, ProviderBase, ProviderCache,
    ProviderConfig, ProviderContext, ProviderFactory, ProviderId,
};
