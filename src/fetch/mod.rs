//! Device HTTP access.
//!
//! This module wraps a plain HTTP exchange with transparent digest
//! authentication. Requests go out through a [`Transport`]; the
//! [`AuthenticatedFetcher`] answers a `WWW-Authenticate` challenge by
//! retrying once with a computed `Authorization` header.

mod fetcher;
mod request;
pub(crate) mod transport;

pub use fetcher::{fetch, AuthenticatedFetcher, ClientSession, FetchError, MAX_ATTEMPTS};
pub use request::{DeviceResponse, PendingRequest};
pub use transport::{base_url, ReqwestTransport, Transport, TransportError};
