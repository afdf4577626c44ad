//! Outbound request and buffered response types.

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};

/// A request to the device, kept across the digest retry.
///
/// `path` is the request path only (no host or query string); it is both the
/// URL suffix and the digest `uri`.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, e.g. `/main`.
    pub path: String,
    /// Headers sent with every attempt.
    pub headers: HeaderMap,
    /// Optional body, resent unchanged on retry.
    pub body: Option<Vec<u8>>,
}

impl PendingRequest {
    /// Creates a request with no headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Attaches a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// True when an `Authorization` header is already set.
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Sets the `Authorization` header, replacing any previous value.
    ///
    /// Bytes outside ASCII are allowed; control characters are not.
    pub fn set_authorization(&mut self, value: impl AsRef<[u8]>) -> Result<(), InvalidHeaderValue> {
        let mut value = HeaderValue::from_bytes(value.as_ref())?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// A device response with its body read into memory.
#[derive(Debug, Clone)]
pub struct DeviceResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: String,
}

impl DeviceResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header (builder style, used by transports and tests).
    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Raw bytes of a non-empty `WWW-Authenticate` value, if any.
    ///
    /// Not restricted to ASCII: devices may send a realm in an 8-bit
    /// charset.
    pub fn www_authenticate(&self) -> Option<&[u8]> {
        self.headers
            .get(WWW_AUTHENTICATE)
            .map(HeaderValue::as_bytes)
            .filter(|v| !v.is_empty())
    }
}
