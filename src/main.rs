//! confluence - headless multi-strategy trading session
//!
//! Runs ticks on an interval until Ctrl+C or the tick budget is spent.
//! Configuration comes from the environment (and `.env`).
//!
//! # Usage
//! ```sh
//! SYMBOLS=BTC/USDT,ETH/USDT TICK_INTERVAL_SECONDS=5 cargo run -- --ticks 100
//! ```

use anyhow::Result;
use clap::Parser;
use confluence::application::system::Application;
use confluence::config::Config;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Stop after this many ticks (runs until Ctrl+C when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Run a single tick and exit
    #[arg(long, conflicts_with = "ticks")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let budget = if cli.once { Some(1) } else { cli.ticks };

    info!("confluence {} starting...", env!("CARGO_PKG_VERSION"));
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Mode={:?}, Symbols={:?}, Timeframe={}, Risk={}",
        config.session.mode,
        config.session.symbols,
        config.session.timeframe,
        config.risk.risk_level
    );
    let tick_interval = config.tick_interval();

    let app = Application::build(config).await?;
    let mut interval = tokio::time::interval(tick_interval);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = app.run_tick().await;
                ticks += 1;
                for err in &report.errors {
                    warn!("Tick {}: {} failed: {}", ticks, err.symbol, err.error);
                }
                info!(
                    "Tick {} complete: {} new trades, {} errors",
                    ticks,
                    report.new_trades.len(),
                    report.errors.len()
                );
                if budget.is_some_and(|max| ticks >= max) {
                    info!("Tick budget reached.");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    app.shutdown().await?;
    info!("Metrics:\n{}", app.metrics.render());
    Ok(())
}
