//! Status page extraction.
//!
//! The `/main` page lays out its readings in `.grid-grey` panels:
//!
//! - the first panel holds the input voltage in `div:nth-child(3) span`;
//! - the second panel holds one `.grid-block` per outlet, whose first two
//!   `p` elements are the outlet's watts and amps.
//!
//! Values carry a unit suffix (`120.1V`, `35W`, `0.3A`) which is stripped
//! before parsing. A reading that fails to parse is reported on its own and
//! does not stop the others.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors building the page parser.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A built-in CSS selector failed to compile.
    #[error("invalid selector {selector:?}: {reason}")]
    Selector {
        /// The selector source.
        selector: &'static str,
        /// Parser message.
        reason: String,
    },
}

/// Which value a reading or failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingKind {
    /// Input voltage.
    Voltage,
    /// Power draw of one outlet.
    Watts {
        /// Zero-based outlet index.
        outlet: usize,
    },
    /// Current draw of one outlet.
    Amps {
        /// Zero-based outlet index.
        outlet: usize,
    },
}

impl std::fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingKind::Voltage => write!(f, "voltage"),
            ReadingKind::Watts { outlet } => write!(f, "watts (outlet {})", outlet),
            ReadingKind::Amps { outlet } => write!(f, "amps (outlet {})", outlet),
        }
    }
}

/// A successfully parsed value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// What was measured.
    pub kind: ReadingKind,
    /// The number with its unit removed.
    pub value: f64,
}

/// A value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: cannot parse {text:?}")]
pub struct ReadingError {
    /// What the text should have held.
    pub kind: ReadingKind,
    /// The raw element text.
    pub text: String,
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    /// Values that parsed, in page order.
    pub readings: Vec<Reading>,
    /// Values that did not, in page order.
    pub failures: Vec<ReadingError>,
}

impl ScrapeReport {
    fn push(&mut self, kind: ReadingKind, text: String) {
        match parse_measurement(&text) {
            Some(value) => self.readings.push(Reading { kind, value }),
            None => self.failures.push(ReadingError { kind, text }),
        }
    }

    /// Returns the voltage reading, if one was parsed.
    pub fn voltage(&self) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.kind == ReadingKind::Voltage)
            .map(|r| r.value)
    }

    /// Number of outlets seen on the page, parsed or not.
    pub fn outlet_count(&self) -> usize {
        let outlet = |kind: &ReadingKind| match kind {
            ReadingKind::Watts { outlet } | ReadingKind::Amps { outlet } => Some(*outlet + 1),
            ReadingKind::Voltage => None,
        };
        self.readings
            .iter()
            .map(|r| &r.kind)
            .chain(self.failures.iter().map(|f| &f.kind))
            .filter_map(outlet)
            .max()
            .unwrap_or(0)
    }
}

/// Parses a value such as `120.4V` into `120.4`.
///
/// Whitespace is trimmed, then every trailing non-digit character is
/// removed, not just a single unit letter. Multi-character suffixes such as
/// `" kW"` or `"V/AC"` are stripped as well.
pub fn parse_measurement(text: &str) -> Option<f64> {
    let number = text.trim().trim_end_matches(|c: char| !c.is_ascii_digit());
    if number.is_empty() {
        return None;
    }
    number.trim().parse().ok()
}

fn selector(css: &'static str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css,
        reason: e.to_string(),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Extracts readings from the device status page.
#[derive(Debug)]
pub struct StatusPageParser {
    panel: Selector,
    voltage: Selector,
    outlet: Selector,
    value: Selector,
}

impl StatusPageParser {
    /// Compiles the page selectors.
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            panel: selector(".grid-grey")?,
            voltage: selector("div:nth-child(3) span")?,
            outlet: selector(".grid-block")?,
            value: selector("p")?,
        })
    }

    /// Parses an HTML page into readings.
    pub fn parse(&self, html: &str) -> ScrapeReport {
        let document = Html::parse_document(html);
        let mut report = ScrapeReport::default();

        for (index, panel) in document.select(&self.panel).enumerate() {
            match index {
                0 => {
                    let text: String = panel.select(&self.voltage).map(text_of).collect();
                    report.push(ReadingKind::Voltage, text);
                }
                1 => {
                    for (outlet, block) in panel.select(&self.outlet).enumerate() {
                        for (position, value) in block.select(&self.value).take(2).enumerate() {
                            let kind = if position == 0 {
                                ReadingKind::Watts { outlet }
                            } else {
                                ReadingKind::Amps { outlet }
                            };
                            report.push(kind, text_of(value));
                        }
                    }
                }
                _ => break,
            }
        }

        report
    }
}
