//! Slateboard CLI binary

use anyhow::Result;

use slateboard::cli::{log_filter, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = CliApp::app().get_matches();

    // Logs go to stderr so `plugins list` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(matches.get_count("verbose")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    CliApp::run(&matches).await
}
