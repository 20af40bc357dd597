//! Agent relay server binary

use anyhow::Context;
use clap::Parser;
use relay_server::cli::Cli;
use relay_server::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli
        .load_config()
        .context("Failed to load relay configuration")?;
    let state = AppState::from_config(&config).context("Failed to create agent connector")?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    info!(
        addr = %config.listen_addr,
        agent = %config.agent.base_url,
        "Agent relay listening"
    );

    tokio::select! {
        result = relay_server::serve(listener, state) => {
            result.context("Relay server failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Received SIGINT (Ctrl+C), shutting down"),
                Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
            }
        }
    }

    Ok(())
}

/// Initialize tracing; `--verbose` forces debug output, otherwise `RUST_LOG`
/// applies with `info` as the default.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
