//! Provider contract shared between the slateboard host and display providers
//!
//! A provider is a pluggable unit that refreshes its own data on a cadence
//! (`update`) and renders one or more display modes onto a shared surface
//! (`display`). The host owns scheduling; providers only answer questions
//! about themselves.

pub mod base;
pub mod cache;
pub mod surface;
pub mod traits;

pub use base::*;
pub use cache::*;
pub use surface::*;
pub use traits::*;

/// Provider identifier, unique across a registry
pub type ProviderId = String;

/// Display mode identifier
pub type ModeId = String;
