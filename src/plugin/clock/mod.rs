//! Clock provider: shows local time

pub mod factory;
pub mod provider;


pub use factory::ClockProviderFactory;
pub use provider::ClockProvider;
