//! Run command implementation

use crate::cli::utils;
use crate::Slateboard;
use anyhow::Result;
use clap::{ArgMatches, Command};
use tokio::sync::watch;
use tracing::{info, warn};

pub fn command() -> Command {
    Command::new("run")
        .about("Load providers and drive the display until interrupted")
        .arg(utils::config_arg())
        .arg(
            clap::Arg::new("ticks")
                .short('n')
                .long("ticks")
                .help("Stop after this many scheduler ticks")
                .value_name("N")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let config = utils::load_config(matches)?;
    let max_ticks = matches.get_one::<u64>("ticks").copied();

    let app = Slateboard::new(config)?;
    let report = app.initialize().await?;
    let summary = &report.load;

    println!(
        "Loaded {} providers ({} disabled, {} failed)",
        summary.loaded.len(),
        summary.disabled.len(),
        summary.failed.len()
    );
    for (id, error) in &summary.failed {
        println!("  {id}: {error}");
    }
    for rejected in &report.rejected {
        println!("  skipped manifest: {rejected}");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!("Failed to listen for interrupt: {}", e);
                // Keep the sender alive so the render loop is not stopped
                std::future::pending::<()>().await;
            }
        }
    });

    app.run(shutdown_rx, max_ticks).await?;
    app.shutdown().await;

    Ok(())
}
