//! Configuration management for slateboard

pub mod config;
pub mod plugins;
pub mod runtime;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use config::Config;
pub use plugins::PluginsConfig;
pub use runtime::{CacheConfig, ExecutorConfig, RotationConfig};
