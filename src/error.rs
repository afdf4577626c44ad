//! Top-level error type for the exporter process.

use crate::config::ConfigError;
use crate::fetch::TransportError;
use crate::metrics::{MetricsError, ServerError};
use crate::poller::PollError;
use crate::scrape::ScrapeError;
use thiserror::Error;

/// Any error that terminates the exporter.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Settings were missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The device HTTP client could not be built.
    #[error("device transport error: {0}")]
    Transport(#[from] TransportError),

    /// The status page selectors failed to compile.
    #[error("page parser error: {0}")]
    Scrape(#[from] ScrapeError),

    /// Gauges could not be registered.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// The `/metrics` listener failed.
    #[error("metrics server error: {0}")]
    Server(#[from] ServerError),

    /// The poll loop hit a fatal error.
    #[error("poller stopped: {0}")]
    Poll(#[from] PollError),

    /// The poll task panicked or was cancelled.
    #[error("poller task failed: {0}")]
    PollerTask(#[from] tokio::task::JoinError),
}
