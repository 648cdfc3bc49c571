//! CLI command implementations

use anyhow::Result;
use clap::{ArgMatches, Command};

pub mod commands;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Create the CLI application
    pub fn app() -> Command {
        Command::new("slateboard")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Rotate pluggable display providers on a shared screen")
            .subcommand_negates_reqs(true)
            .arg(
                clap::Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence")
                    .action(clap::ArgAction::Count)
                    .global(true),
            )
            .subcommand(commands::init::command())
            .subcommand(commands::run::command())
            .subcommand(commands::validate::command())
            .subcommand(commands::plugins::command())
    }

    /// Run the CLI application
    pub async fn run(matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("init", sub_matches)) => commands::init::run(sub_matches).await,
            Some(("run", sub_matches)) => commands::run::run(sub_matches).await,
            Some(("validate", sub_matches)) => commands::validate::run(sub_matches).await,
            Some(("plugins", sub_matches)) => commands::plugins::run(sub_matches).await,
            _ => {
                // No subcommand provided, show help
                let _ = Self::app().print_help();
                Ok(())
            }
        }
    }
}

/// Log filter for the host and provider crates at the requested verbosity
pub fn log_filter(verbosity: u8) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::EnvFilter::new(format!("slateboard={level},slateboard_provider={level}"))
}

/// Common CLI utilities
pub mod utils {
    use anyhow::Result;
    use std::path::Path;

    /// The `--config` argument shared by several commands
    pub fn config_arg() -> clap::Arg {
        clap::Arg::new("config")
            .short('c')
            .long("config")
            .help("Configuration file path")
            .value_name("FILE")
    }

    /// Load configuration from `--config`, a default location, or defaults
    pub fn load_config(matches: &clap::ArgMatches) -> Result<crate::Config> {
        let path = matches.get_one::<String>("config").map(Path::new);
        crate::Config::load(path)
    }

    /// Create an instance with built-ins registered and manifests discovered,
    /// without loading anything
    pub async fn create_discovered_app(
        matches: &clap::ArgMatches,
    ) -> Result<(crate::Slateboard, crate::StartupReport)> {
        let mut config = load_config(matches)?;
        config.plugins.auto_load = false;

        let app = crate::Slateboard::new(config)?;
        let report = app.initialize().await?;
        Ok((app, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flag() {
        let matches = CliApp::app().get_matches_from(["slateboard", "plugins", "list"]);
        assert_eq!(matches.get_count("verbose"), 0);

        let matches = CliApp::app().get_matches_from(["slateboard", "-vv", "plugins", "list"]);
        assert_eq!(matches.get_count("verbose"), 2);
    }
}
