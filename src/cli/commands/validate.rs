//! Validate command implementation

use crate::cli::utils;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use tracing::info;

pub fn command() -> Command {
    Command::new("validate")
        .about("Validate the configuration and every discovered manifest")
        .arg(utils::config_arg())
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    info!("Validating configuration and manifests");

    let config = utils::load_config(matches)?;

    println!("Configuration file is valid!");
    println!("Version: {}", config.version);
    println!("Plugin directories:");
    for dir in config.plugins.expanded_directories()? {
        println!("  - {}", dir.display());
    }

    let (app, report) = utils::create_discovered_app(matches).await?;
    let registry = app.registry();

    let mut problems = 0;
    for manifest in registry.manifests().await {
        match registry.gate().check(&manifest) {
            Ok(()) => println!("  ok       {} ({})", manifest.id, manifest.class_name),
            Err(e) => {
                println!("  REJECTED {}: {}", manifest.id, e);
                problems += 1;
            }
        }
    }

    for rejected in &report.rejected {
        println!("  INVALID  {}", rejected);
        problems += 1;
    }

    if problems > 0 {
        return Err(anyhow!("{} manifest problem(s) found", problems));
    }

    println!("All manifests are valid.");
    Ok(())
}
