//! Alert provider: preempts rotation while a trigger file holds a message

pub mod factory;
pub mod provider;


pub use factory::AlertProviderFactory;
pub use provider::AlertProvider;
