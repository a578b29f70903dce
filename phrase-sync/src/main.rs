use anyhow::Result;
use clap::Parser;
use phrase_sync::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment, e.g. PHRASE_SECRET from .env
    dotenvy::dotenv().ok();

    // Initialize tracing for the CLI. Logs go to stderr, command output to stdout.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
