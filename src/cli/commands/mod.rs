//! CLI command modules

pub mod init;
pub mod plugins;
pub mod run;
pub mod validate;
