//! Provider traits and interfaces

pub mod factory;
pub mod provider;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use factory::*;
pub use provider::*;
