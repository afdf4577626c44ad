//! HTML extraction of device telemetry.
//!
//! Turns the device status page into named numeric readings: one input
//! voltage and a watts/amps pair per outlet.

mod parser;

pub use parser::{
    parse_measurement, Reading, ReadingError, ReadingKind, ScrapeError, ScrapeReport,
    StatusPageParser,
};
