use dotenv::dotenv;
use tick_export::{export_ticks, ExportConfig, HttpTerminal};
use tracing_subscriber::EnvFilter;

/// Exports historical ticks for one symbol to a CSV file.
///
/// # Workflow Steps
/// - Load environment variables from .env file
/// - Read the export settings (symbol, range, output directory, bridge URL)
/// - Connect to the terminal bridge, select the symbol and copy its ticks
/// - Write `<SYMBOL>_ticks_<from>_<to>.csv`
///
/// Any failure is logged and ends the process with status 1. The terminal
/// connection is shut down before that happens.
#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging, RUST_LOG may come from .env
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = ExportConfig::from_env()?;
    tracing::info!(
        terminal = %config.terminal_url,
        symbol = %config.request.symbol,
        "starting tick export"
    );

    let terminal = HttpTerminal::new(config.terminal_url.clone());
    let summary = export_ticks(&terminal, &config).await?;

    println!(
        "Saved {} ticks for {} to {}",
        summary.rows,
        config.request.symbol,
        summary.path.display()
    );

    Ok(())
}
