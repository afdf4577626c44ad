//! WattBox Prometheus Exporter
//!
//! Polls the device status page and serves the readings on `/metrics`.

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use wattbox_exporter::{
    fetch::{AuthenticatedFetcher, ReqwestTransport},
    metrics::{MetricsRegistry, MetricsServer},
    poller::Poller,
    scrape::StatusPageParser,
    Cli, ExporterConfig, ExporterError,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match ExporterConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: ExporterConfig) -> Result<(), ExporterError> {
    info!("WattBox exporter v{}", wattbox_exporter::VERSION);

    let transport = ReqwestTransport::new(&config.host)?;
    info!(device = %transport.base_url(), "Device configured");

    let metrics = Arc::new(MetricsRegistry::new()?);
    let poller = Poller::new(
        AuthenticatedFetcher::new(config.credential.clone(), transport),
        StatusPageParser::new()?,
        Arc::clone(&metrics),
        config.poll_interval,
    );
    let server = MetricsServer::new(config.metrics.clone(), metrics);

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let mut poller_task = poller.spawn();

    tokio::select! {
        result = &mut poller_task => result??,
        result = server.run(shutdown) => {
            poller_task.abort();
            result?;
            info!("Shutting down");
        }
    }

    Ok(())
}
