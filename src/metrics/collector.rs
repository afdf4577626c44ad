//! Metrics collection and registry.

use crate::scrape::{ReadingKind, ScrapeReport};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Label carrying the 0-based outlet index.
const OUTLET_LABEL: &str = "outlet";

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Gauge creation, registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus gauges for device telemetry.
///
/// Every gauge keeps the last value written; a scrape overwrites the
/// previous one. Gauges are atomic, so the registry can be shared behind an
/// `Arc` between the poller and the HTTP endpoint without a lock.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Device telemetry
    voltage: Gauge,
    watts: GaugeVec,
    amps: GaugeVec,

    // Exporter health
    up: Gauge,
    last_scrape_timestamp: Gauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all device metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let voltage = Gauge::new("wattbox_voltage", "Input voltage reported by the device")?;
        let watts = GaugeVec::new(
            Opts::new("wattbox_watts", "Power draw per outlet in watts"),
            &[OUTLET_LABEL],
        )?;
        let amps = GaugeVec::new(
            Opts::new("wattbox_amps", "Current draw per outlet in amps"),
            &[OUTLET_LABEL],
        )?;

        let up = Gauge::new(
            "wattbox_up",
            "Whether the last poll returned a status page (1=yes, 0=no)",
        )?;
        let last_scrape_timestamp = Gauge::new(
            "wattbox_last_scrape_timestamp_seconds",
            "Unix time of the last successful status page extraction",
        )?;

        registry.register(Box::new(voltage.clone()))?;
        registry.register(Box::new(watts.clone()))?;
        registry.register(Box::new(amps.clone()))?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(last_scrape_timestamp.clone()))?;

        Ok(Self {
            registry,
            voltage,
            watts,
            amps,
            up,
            last_scrape_timestamp,
        })
    }

    /// Writes every parsed reading; failed readings keep their last value.
    pub fn record(&self, report: &ScrapeReport) {
        for reading in &report.readings {
            let (gauge, outlet) = match reading.kind {
                ReadingKind::Voltage => {
                    self.voltage.set(reading.value);
                    continue;
                }
                ReadingKind::Watts { outlet } => (&self.watts, outlet),
                ReadingKind::Amps { outlet } => (&self.amps, outlet),
            };
            let label = outlet.to_string();
            gauge.with_label_values(&[label.as_str()]).set(reading.value);
        }
        self.last_scrape_timestamp
            .set(chrono::Utc::now().timestamp() as f64);
    }

    /// Records whether the device answered with a usable page.
    pub fn set_up(&self, up: bool) {
        self.up.set(if up { 1.0 } else { 0.0 });
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
