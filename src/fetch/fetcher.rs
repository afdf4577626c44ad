//! Digest-authenticated fetch with a single retry.
//!
//! The exchange is a two-step state machine:
//!
//! ```text
//! Unauthenticated ──401 + challenge──▶ Authenticating ──any response──▶ Done
//!        │
//!        └──────────any other response──────────────────────────────▶ Done
//! ```
//!
//! A request is retried at most once, and only when the response is a 401,
//! the attempt carried no `Authorization` header and the response carries a
//! non-empty `WWW-Authenticate` header. Transport errors are never retried.

use super::{DeviceResponse, PendingRequest, Transport, TransportError};
use crate::auth::{authorization_header, AuthChallenge, Credential, DigestError};
use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

/// Upper bound on requests per fetch: the initial one and one retry.
pub const MAX_ATTEMPTS: usize = 2;

/// Errors that abort a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or its response read.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building the digest response failed (random source exhausted).
    #[error(transparent)]
    Digest(#[from] DigestError),

    /// The computed `Authorization` value is not a valid header.
    #[error("challenge produced an invalid Authorization header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

impl FetchError {
    /// True for failures the process cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Digest(_))
    }
}

/// Everything one fetch needs. Built fresh for every poll.
pub struct ClientSession<'a, T: Transport + ?Sized> {
    /// Login used to answer a challenge.
    pub credential: &'a Credential,
    /// Where requests are sent.
    pub transport: &'a T,
    /// Mutated in place when the `Authorization` header is added.
    pub request: PendingRequest,
}

impl<'a, T: Transport + ?Sized> ClientSession<'a, T> {
    /// Starts an unauthenticated session for `request`.
    pub fn new(credential: &'a Credential, transport: &'a T, request: PendingRequest) -> Self {
        Self {
            credential,
            transport,
            request,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthState {
    Unauthenticated,
    Authenticating,
}

/// Returns the challenge to answer, if `response` warrants a retry.
fn retry_challenge(request: &PendingRequest, response: &DeviceResponse) -> Option<AuthChallenge> {
    if response.status != StatusCode::UNAUTHORIZED || request.has_authorization() {
        return None;
    }
    response
        .www_authenticate()
        .map(AuthChallenge::from_header_bytes)
}

/// Executes `session.request`, answering one digest challenge if needed.
///
/// Non-401 responses, and a 401 that persists after authenticating, are
/// returned as-is for the caller to interpret.
pub async fn fetch<T: Transport + ?Sized>(
    session: &mut ClientSession<'_, T>,
) -> Result<DeviceResponse, FetchError> {
    let mut state = AuthState::Unauthenticated;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let response = session.transport.execute(&session.request).await?;
        debug!(
            attempt,
            method = %session.request.method,
            path = %session.request.path,
            status = %response.status,
            "Device request completed"
        );

        if state == AuthState::Authenticating || attempt >= MAX_ATTEMPTS {
            return Ok(response);
        }

        let Some(challenge) = retry_challenge(&session.request, &response) else {
            return Ok(response);
        };

        if challenge.is_empty() {
            debug!("Unrecognised authentication challenge, answering with empty digest");
        }

        let header = authorization_header(
            session.credential,
            &challenge,
            session.request.method.as_str(),
            &session.request.path,
        )?;
        session.request.set_authorization(&header)?;
        state = AuthState::Authenticating;
    }
}

/// Fetches pages from one device with a fixed credential.
pub struct AuthenticatedFetcher<T: Transport> {
    credential: Credential,
    transport: T,
}

impl<T: Transport> AuthenticatedFetcher<T> {
    /// Creates a fetcher that logs in as `credential` over `transport`.
    pub fn new(credential: Credential, transport: T) -> Self {
        Self {
            credential,
            transport,
        }
    }

    /// Starts a session for `request`.
    pub fn session(&self, request: PendingRequest) -> ClientSession<'_, T> {
        ClientSession::new(&self.credential, &self.transport, request)
    }

    /// Fetches `request`, answering a digest challenge if one is issued.
    pub async fn fetch(&self, request: PendingRequest) -> Result<DeviceResponse, FetchError> {
        let mut session = self.session(request);
        fetch(&mut session).await
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
