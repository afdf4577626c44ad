//! WattBox Prometheus Exporter Library
//!
//! Periodically scrapes a power-distribution unit's embedded web interface
//! and republishes its voltage and per-outlet power readings as Prometheus
//! gauges.
//!
//! # Architecture
//!
//! ```text
//! poller → fetch (digest auth) → scrape → metrics ← HTTP /metrics
//! ```
//!
//! The device login uses HTTP digest authentication: the first request is
//! sent bare, and a `401` carrying a `WWW-Authenticate` challenge is
//! answered exactly once with a computed `Authorization` header.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wattbox_exporter::{
//!     auth::Credential,
//!     fetch::{AuthenticatedFetcher, ReqwestTransport},
//!     metrics::MetricsRegistry,
//!     poller::Poller,
//!     scrape::StatusPageParser,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new("192.168.1.50")?;
//! let fetcher = AuthenticatedFetcher::new(Credential::new("admin", "secret"), transport);
//! let metrics = Arc::new(MetricsRegistry::new()?);
//!
//! let poller = Poller::new(fetcher, StatusPageParser::new()?, metrics, Duration::from_secs(30));
//! poller.poll_once().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod poller;
pub mod scrape;

// Re-export commonly used types at crate root
pub use auth::{AuthChallenge, Credential};
pub use config::{Cli, ExporterConfig};
pub use error::ExporterError;
pub use fetch::{AuthenticatedFetcher, FetchError, PendingRequest, ReqwestTransport, Transport};
pub use metrics::{MetricsRegistry, MetricsServer};
pub use poller::{PollOutcome, Poller};
pub use scrape::{ScrapeReport, StatusPageParser};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
