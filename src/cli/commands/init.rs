//! Init command implementation

use crate::plugin::ProviderConfig;
use crate::utils::ensure_directory;
use crate::Config;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub fn command() -> Command {
    Command::new("init")
        .about("Initialize a new configuration file")
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file path")
                .value_name("FILE")
                .default_value(crate::config::config::DEFAULT_CONFIG_FILE),
        )
        .arg(
            clap::Arg::new("force")
                .short('f')
                .long("force")
                .help("Overwrite an existing file")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let output_path = PathBuf::from(
        matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or(crate::config::config::DEFAULT_CONFIG_FILE),
    );

    if output_path.exists() && !matches.get_flag("force") {
        return Err(anyhow!(
            "{:?} already exists, use --force to overwrite",
            output_path
        ));
    }

    info!("Initializing configuration file: {:?}", output_path);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    create_default_config().save_to_file(&output_path)?;

    println!("Configuration file created: {}", output_path.display());
    println!("Edit the providers section to configure the built-in clock and alert.");

    Ok(())
}

/// Default configuration with sections for the built-in providers
pub fn create_default_config() -> Config {
    let mut config = Config::default();

    let mut clock = ProviderConfig::default();
    clock.display_duration = Some(10);
    clock
        .settings
        .insert("format".to_string(), serde_yaml::Value::from("%H:%M"));
    config.providers.insert("clock".to_string(), clock);

    let mut alert = ProviderConfig::default();
    alert.live_priority = true;
    alert.settings.insert(
        "trigger_file".to_string(),
        serde_yaml::Value::from("~/.config/slateboard/alert.txt"),
    );
    config.providers.insert("alert".to_string(), alert);

    config
}
