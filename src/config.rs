//! Exporter configuration.
//!
//! Settings come from the command line, the environment and an optional
//! TOML file, in that order of precedence. They are resolved once at
//! startup into an immutable [`ExporterConfig`].

use crate::auth::Credential;
use crate::metrics::{MetricsServerConfig, DEFAULT_METRICS_PORT};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: &str = "30s";

/// Command line arguments, with environment variable fallbacks.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "wattbox-exporter", version, about)]
pub struct Cli {
    /// Device address, e.g. `192.168.1.50` or `pdu.local:8080`.
    #[arg(long, env = "WATTBOX_HOST")]
    pub host: Option<String>,

    /// Device login name.
    #[arg(long, env = "WATTBOX_USER")]
    pub user: Option<String>,

    /// Device login password.
    #[arg(long, env = "WATTBOX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Time between polls, e.g. `30s`, `1m`, `1m 30s`.
    #[arg(long, env = "POLL_DURATION")]
    pub poll_interval: Option<String>,

    /// Address the metrics endpoint listens on.
    #[arg(long, env = "WATTBOX_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Optional TOML configuration file.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was absent or empty.
    #[error("missing required setting {0}")]
    Missing(&'static str),
    /// The poll interval was zero or not a duration.
    #[error("invalid poll interval {value:?}: {reason}")]
    InvalidPollInterval {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for [`FileConfig`].
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[device]` table.
    #[serde(default)]
    pub device: DeviceConfig,
    /// `[exporter]` table.
    #[serde(default)]
    pub exporter: ExporterSection,
}

/// Device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    /// Device address, `host[:port]` or a full URL.
    pub host: Option<String>,
    /// Login name.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

/// Exporter behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExporterSection {
    /// Poll interval as a duration string.
    pub poll_interval: Option<String>,
    /// Metrics listen address.
    pub listen: Option<SocketAddr>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Resolved, immutable exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Device address.
    pub host: String,
    /// Device login.
    pub credential: Credential,
    /// Time between polls.
    pub poll_interval: Duration,
    /// Metrics endpoint settings.
    pub metrics: MetricsServerConfig,
}

impl ExporterConfig {
    /// Resolves configuration from the command line and its config file.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, &file)
    }

    /// Merges command line values over file values and validates them.
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Result<Self, ConfigError> {
        let host = required(&cli.host, &file.device.host, "WATTBOX_HOST")?;
        let user = required(&cli.user, &file.device.user, "WATTBOX_USER")?;
        let password = required(&cli.password, &file.device.password, "WATTBOX_PASSWORD")?;

        let interval = cli
            .poll_interval
            .as_deref()
            .or(file.exporter.poll_interval.as_deref())
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let poll_interval = parse_poll_interval(interval)?;

        let bind_addr = cli
            .listen
            .or(file.exporter.listen)
            .unwrap_or_else(|| MetricsServerConfig::with_port(DEFAULT_METRICS_PORT).bind_addr);

        Ok(Self {
            host,
            credential: Credential::new(user, password),
            poll_interval,
            metrics: MetricsServerConfig { bind_addr },
        })
    }
}

fn required(
    cli: &Option<String>,
    file: &Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    cli.as_ref()
        .or(file.as_ref())
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(ConfigError::Missing(name))
}

/// Parses a poll interval such as `30s` or `1m 30s`.
pub fn parse_poll_interval(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPollInterval {
        value: value.to_string(),
        reason,
    };

    let interval = humantime::parse_duration(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if interval.is_zero() {
        return Err(invalid("must be greater than zero".to_string()));
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> Cli {
        Cli {
            host: Some("10.0.0.5".to_string()),
            user: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..Cli::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = ExporterConfig::resolve(&cli(), &FileConfig::default()).unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.credential.username(), "admin");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.metrics.bind_addr.port(), 8181);
    }

    #[test]
    fn test_missing_required_values() {
        let mut args = cli();
        args.host = None;
        assert!(matches!(
            ExporterConfig::resolve(&args, &FileConfig::default()),
            Err(ConfigError::Missing("WATTBOX_HOST"))
        ));

        let mut args = cli();
        args.password = Some(String::new());
        assert!(matches!(
            ExporterConfig::resolve(&args, &FileConfig::default()),
            Err(ConfigError::Missing("WATTBOX_PASSWORD"))
        ));
    }

    #[test]
    fn test_poll_interval_formats() {
        assert_eq!(parse_poll_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_poll_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_poll_interval("1m 30s").unwrap(), Duration::from_secs(90));
        assert_eq!(
            parse_poll_interval("500ms").unwrap(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_invalid_poll_interval() {
        assert!(matches!(
            parse_poll_interval("soon"),
            Err(ConfigError::InvalidPollInterval { .. })
        ));
        assert!(matches!(
            parse_poll_interval("0s"),
            Err(ConfigError::InvalidPollInterval { .. })
        ));
    }

    #[test]
    fn test_file_values_overridden_by_cli() {
        let file = FileConfig::from_toml(
            r#"
            [device]
            host = "pdu.local"
            user = "file-user"
            password = "file-pass"

            [exporter]
            poll_interval = "1m"
            listen = "127.0.0.1:9100"
            "#,
        )
        .unwrap();

        let from_file = ExporterConfig::resolve(&Cli::default(), &file).unwrap();
        assert_eq!(from_file.host, "pdu.local");
        assert_eq!(from_file.poll_interval, Duration::from_secs(60));
        assert_eq!(from_file.metrics.bind_addr, "127.0.0.1:9100".parse().unwrap());

        let merged = ExporterConfig::resolve(&cli(), &file).unwrap();
        assert_eq!(merged.host, "10.0.0.5");
        assert_eq!(merged.credential.username(), "admin");
        assert_eq!(merged.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[device"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_rejected() {
        let args = Cli {
            config: Some(PathBuf::from("/nonexistent/wattbox.toml")),
            ..cli()
        };
        assert!(matches!(
            ExporterConfig::load(&args),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
