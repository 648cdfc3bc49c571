//! Plugin inspection CLI commands

use crate::cli::utils;
use crate::plugin::Manifest;
use crate::utils::format_duration;
use anyhow::{anyhow, Result};

/// Create the plugins command
pub fn command() -> clap::Command {
    clap::Command::new("plugins")
        .about("Inspect display providers")
        .subcommand_negates_reqs(true)
        .subcommand(
            clap::Command::new("list")
                .about("List discovered providers")
                .arg(utils::config_arg())
                .arg(
                    clap::Arg::new("detailed")
                        .short('d')
                        .long("detailed")
                        .help("Show detailed information")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            clap::Command::new("info")
                .about("Show provider information")
                .arg(utils::config_arg())
                .arg(clap::arg!(<PLUGIN_ID> "Provider ID")),
        )
}

/// Run plugin command
pub async fn run(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("list", sub_matches)) => run_list(sub_matches, sub_matches.get_flag("detailed")).await,
        Some(("info", sub_matches)) => {
            let plugin_id = sub_matches
                .get_one::<String>("PLUGIN_ID")
                .ok_or_else(|| anyhow!("Provider ID is required"))?;
            run_info(sub_matches, plugin_id).await
        }
        _ => {
            let _ = command().print_help();
            Ok(())
        }
    }
}

async fn run_list(matches: &clap::ArgMatches, detailed: bool) -> Result<()> {
    let (app, _) = utils::create_discovered_app(matches).await?;
    let registry = app.registry();
    let manifests = registry.manifests().await;

    if manifests.is_empty() {
        println!("No providers found.");
        return Ok(());
    }

    println!("Available providers:");
    println!();

    for manifest in manifests {
        let verdict = match registry.gate().check(&manifest) {
            Ok(()) => "compatible".to_string(),
            Err(e) => format!("incompatible ({e})"),
        };

        println!(
            "  {} v{}",
            manifest.name,
            manifest.version.as_deref().unwrap_or("-")
        );
        println!("    ID: {}", manifest.id);
        println!("    Modes: {}", manifest.display_modes.join(", "));
        println!("    Status: {verdict}");

        if detailed {
            print_details(&manifest);
        }

        println!();
    }

    Ok(())
}

async fn run_info(matches: &clap::ArgMatches, plugin_id: &str) -> Result<()> {
    let (app, _) = utils::create_discovered_app(matches).await?;
    let registry = app.registry();

    let Some(manifest) = registry
        .manifests()
        .await
        .into_iter()
        .find(|m| m.id == plugin_id)
    else {
        println!("Provider '{plugin_id}' not found.");
        return Ok(());
    };

    println!("Provider Information:");
    println!("  Name: {}", manifest.name);
    println!("  ID: {}", manifest.id);
    println!("  Version: {}", manifest.version.as_deref().unwrap_or("-"));
    if let Some(description) = &manifest.description {
        println!("  Description: {description}");
    }
    if let Some(author) = &manifest.author {
        println!("  Author: {author}");
    }
    print_details(&manifest);

    let config = app.config().provider(plugin_id);
    println!("  Enabled: {}", config.enabled);
    println!("  Live priority: {}", config.live_priority);
    match registry.gate().check(&manifest) {
        Ok(()) => println!("  Compatible with this host"),
        Err(e) => println!("  Not loadable: {e}"),
    }

    Ok(())
}

fn print_details(manifest: &Manifest) {
    println!("    Class: {} ({})", manifest.class_name, manifest.entry_point);
    println!("    Required API: {}", manifest.required_api_version);
    println!("    Host versions: {}", manifest.compatible_host_versions);
    println!("    Update interval: {}", format_duration(manifest.update_interval));
    println!("    Default duration: {}", format_duration(manifest.default_duration));
    println!("    Source: {}", manifest.source_path.display());
}
