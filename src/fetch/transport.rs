//! HTTP transport abstraction.
//!
//! The fetcher talks to the device through [`Transport`] so the digest
//! handshake can be exercised against a scripted transport in tests.

use super::{DeviceResponse, PendingRequest};
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

/// User agent sent to the device.
const USER_AGENT: &str = concat!("wattbox-exporter/", env!("CARGO_PKG_VERSION"));

/// Errors raised below the HTTP status level.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, timeout or body read failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device address does not form a valid URL.
    #[error("invalid device URL: {0}")]
    InvalidUrl(String),
}

/// Executes a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and buffers the response.
    async fn execute(&self, request: &PendingRequest) -> Result<DeviceResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for the device at `host`.
    ///
    /// `host` is an address such as `192.168.1.50` or `pdu.local:8080`;
    /// plain HTTP is assumed unless an explicit scheme is given.
    pub fn new(host: &str) -> Result<Self, TransportError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url(host)?,
        })
    }

    /// Returns the device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &PendingRequest) -> Result<DeviceResponse, TransportError> {
        let url = self.url_for(&request.path)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        tracing::debug!(%status, bytes = body.len(), "Device response received");

        Ok(DeviceResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds the device base URL from a configured host.
pub fn base_url(host: &str) -> Result<Url, TransportError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(TransportError::InvalidUrl("empty host".to_string()));
    }

    let raw = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };

    let url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.host_str().is_none() {
        return Err(TransportError::InvalidUrl(format!("{}: missing host", raw)));
    }
    Ok(url)
}
