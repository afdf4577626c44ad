//! Prometheus metrics exporter for device telemetry.
//!
//! Exposes the last scraped readings in Prometheus text format via an HTTP
//! endpoint.
//!
//! # Metrics Exposed
//!
//! ## Device Metrics
//! - `wattbox_voltage` - Input voltage
//! - `wattbox_watts{outlet}` - Power draw per outlet
//! - `wattbox_amps{outlet}` - Current draw per outlet
//!
//! ## Exporter Metrics
//! - `wattbox_up` - Whether the last poll returned a status page
//! - `wattbox_last_scrape_timestamp_seconds` - Time of the last successful extraction
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wattbox_exporter::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let server = MetricsServer::new(MetricsServerConfig::default(), Arc::clone(&registry));
//! server.run(std::future::pending()).await?;
//! # Ok(())
//! # }
//! ```

mod collector;
mod server;

pub use collector::{MetricsError, MetricsRegistry};
pub use server::{MetricsServer, MetricsServerConfig, ServerError, DEFAULT_METRICS_PORT};
