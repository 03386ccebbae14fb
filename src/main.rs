use anyhow::Context as _;
use clap::Parser;
use pingz::config::Config;
use pingz::poller::{HttpChecker, Poller};
use pingz::server::{bind, create_metrics, serve, wait_for_signal, ReadinessState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "pingz", about = "Export HTTP host reachability as Prometheus metrics")]
struct Cli {
    /// Path to config.yaml file
    #[arg(short, long, default_value = "./config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting pingz");

    // --help exits 0 here; bad arguments exit non-zero
    let cli = Cli::parse();

    let config = Config::load(&cli.config).context("Failed to read config file")?;
    info!(path = %cli.config.display(), "Read config");
    info!(?config, "Loaded config");

    // Startup-fatal: a bad frequency or timeout never reaches the loop
    let poll_config = config.poll_config().context("Failed to parse frequency")?;

    let metrics = create_metrics().context("Failed to create metrics registry")?;
    let readiness = ReadinessState::new();

    let checker = HttpChecker::new(poll_config.timeout).context("Failed to build HTTP client")?;
    let poller = Poller::new(
        poll_config,
        metrics.clone(),
        readiness.clone(),
        Arc::new(checker),
    );

    let listener = bind(config.port)
        .await
        .with_context(|| format!("Failed to listen on 0.0.0.0:{}", config.port))?;
    info!(port = config.port, "Listening on 0.0.0.0");

    let server_handle = tokio::spawn(serve(listener, readiness, metrics));
    let poller_handle = tokio::spawn(async move { poller.run().await });

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => warn!("Metrics server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "Metrics server failed");
                    return Err(e).context("Metrics server failed");
                }
                Err(e) => return Err(e).context("Metrics server task panicked"),
            }
        }
        result = poller_handle => {
            // run() only ends if its task panicked
            if let Err(e) = result {
                error!(error = %e, "Poller task failed");
                return Err(e).context("Poller task failed");
            }
        }
        signal = wait_for_signal() => {
            let signal = signal.context("Failed to register signal handlers")?;
            info!(signal, "Shutting down");
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
