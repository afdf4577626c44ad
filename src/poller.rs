//! Fixed-interval device polling.
//!
//! Each tick fetches the status page, extracts readings and writes them
//! into the metrics registry. Failures stay local to the tick; only a
//! random source failure while answering a digest challenge stops the loop.

use crate::fetch::{AuthenticatedFetcher, FetchError, PendingRequest, Transport};
use crate::metrics::MetricsRegistry;
use crate::scrape::{ScrapeReport, StatusPageParser};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Path of the device status page.
pub const STATUS_PATH: &str = "/main";

/// Shortest interval the poller will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that stop the poll loop.
#[derive(Debug, Error)]
pub enum PollError {
    /// A fetch failed in a way retrying cannot fix.
    #[error("fatal fetch failure: {0}")]
    Fatal(#[source] FetchError),
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The page was fetched and extracted.
    Updated(ScrapeReport),
    /// The device answered with a non-success status; nothing was extracted.
    Rejected(StatusCode),
    /// The request failed below HTTP.
    Unreachable,
}

/// Drives periodic scrapes of one device.
pub struct Poller<T: Transport> {
    fetcher: AuthenticatedFetcher<T>,
    parser: StatusPageParser,
    metrics: Arc<MetricsRegistry>,
    interval: Duration,
}

impl<T: Transport> Poller<T> {
    /// Creates a poller.
    ///
    /// A zero `interval` is raised to [`MIN_POLL_INTERVAL`].
    pub fn new(
        fetcher: AuthenticatedFetcher<T>,
        parser: StatusPageParser,
        metrics: Arc<MetricsRegistry>,
        interval: Duration,
    ) -> Self {
        let interval = if interval.is_zero() {
            warn!(min = ?MIN_POLL_INTERVAL, "Zero poll interval, using minimum");
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        Self {
            fetcher,
            parser,
            metrics,
            interval,
        }
    }

    /// Time between polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls immediately, then every interval, until a fatal error.
    pub async fn run(&self) -> Result<(), PollError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval = ?self.interval, "Polling device");

        loop {
            ticker.tick().await;
            self.poll_once().await?;
        }
    }

    /// Moves the poll loop onto its own task.
    ///
    /// The loop then keeps running while the caller awaits something else,
    /// such as the metrics server. Abort the handle to stop it.
    pub fn spawn(self) -> JoinHandle<Result<(), PollError>>
    where
        T: 'static,
    {
        tokio::spawn(async move { self.run().await })
    }

    /// Runs one fetch-extract-record cycle.
    pub async fn poll_once(&self) -> Result<PollOutcome, PollError> {
        let response = match self.fetcher.fetch(PendingRequest::get(STATUS_PATH)).await {
            Ok(response) => response,
            Err(e) if e.is_fatal() => return Err(PollError::Fatal(e)),
            Err(e) => {
                warn!(error = %e, "Device fetch failed");
                self.metrics.set_up(false);
                return Ok(PollOutcome::Unreachable);
            }
        };

        if !response.status.is_success() {
            warn!(status = %response.status, "Device returned non-success status");
            self.metrics.set_up(false);
            return Ok(PollOutcome::Rejected(response.status));
        }

        let report = self.parser.parse(&response.body);
        for failure in &report.failures {
            warn!(%failure, "Skipping unreadable value");
        }
        debug!(
            readings = report.readings.len(),
            failures = report.failures.len(),
            outlets = report.outlet_count(),
            "Status page extracted"
        );

        self.metrics.record(&report);
        self.metrics.set_up(true);
        Ok(PollOutcome::Updated(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;
    use crate::fetch::transport::mock::MockTransport;
    use crate::fetch::DeviceResponse;
    use reqwest::header::{HeaderValue, WWW_AUTHENTICATE};

    const PAGE: &str = r#"
        <div class="grid-grey"><div></div><div></div><div><span>119.8V</span></div></div>
        <div class="grid-grey">
          <div class="grid-block"><p>12W</p><p>0.1A</p></div>
          <div class="grid-block"><p>?W</p><p>0.4A</p></div>
        </div>
    "#;

    fn poller_every(
        transport: MockTransport,
        interval: Duration,
    ) -> (Poller<MockTransport>, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let poller = Poller::new(
            AuthenticatedFetcher::new(Credential::new("admin", "pw"), transport),
            StatusPageParser::new().unwrap(),
            Arc::clone(&metrics),
            interval,
        );
        (poller, metrics)
    }

    fn poller(transport: MockTransport) -> (Poller<MockTransport>, Arc<MetricsRegistry>) {
        poller_every(transport, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_poll_updates_metrics_after_challenge() {
        let transport = MockTransport::new()
            .respond(
                DeviceResponse::new(StatusCode::UNAUTHORIZED, "").with_header(
                    WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Digest realm="wattbox", nonce="abc", qop="auth""#),
                ),
            )
            .respond(DeviceResponse::new(StatusCode::OK, PAGE));
        let (poller, metrics) = poller(transport);

        let report = match poller.poll_once().await.unwrap() {
            PollOutcome::Updated(report) => report,
            other => panic!("expected update, got {:?}", other),
        };
        assert_eq!(report.readings.len(), 4);
        assert_eq!(report.failures.len(), 1);

        let output = metrics.encode().unwrap();
        assert!(output.contains("wattbox_voltage 119.8"));
        assert!(output.contains(r#"wattbox_watts{outlet="0"} 12"#));
        assert!(output.contains(r#"wattbox_amps{outlet="1"} 0.4"#));
        assert!(output.contains("wattbox_up 1"));
    }

    #[tokio::test]
    async fn test_rejected_status_extracts_nothing() {
        let transport =
            MockTransport::new().respond(DeviceResponse::new(StatusCode::FORBIDDEN, PAGE));
        let (poller, metrics) = poller(transport);

        let outcome = poller.poll_once().await.unwrap();

        assert_eq!(outcome, PollOutcome::Rejected(StatusCode::FORBIDDEN));
        let output = metrics.encode().unwrap();
        assert!(output.contains("wattbox_voltage 0"));
        assert!(output.contains("wattbox_up 0"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_fatal() {
        let transport = MockTransport::new()
            .fail()
            .respond(DeviceResponse::new(StatusCode::OK, PAGE));
        let (poller, metrics) = poller(transport);

        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::Unreachable);
        assert!(matches!(
            poller.poll_once().await.unwrap(),
            PollOutcome::Updated(_)
        ));
        assert!(metrics.encode().unwrap().contains("wattbox_up 1"));
    }

    #[tokio::test]
    async fn test_each_poll_starts_unauthenticated() {
        let challenge = || {
            DeviceResponse::new(StatusCode::UNAUTHORIZED, "").with_header(
                WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Digest realm="r", nonce="n", qop="auth""#),
            )
        };
        let transport = MockTransport::new()
            .respond(challenge())
            .respond(DeviceResponse::new(StatusCode::OK, PAGE))
            .respond(challenge())
            .respond(DeviceResponse::new(StatusCode::OK, PAGE));
        let (poller, _) = poller(transport);

        poller.poll_once().await.unwrap();
        poller.poll_once().await.unwrap();

        let requests = poller.fetcher.transport().requests();
        assert_eq!(requests.len(), 4);
        assert!(!requests[2].has_authorization());
        assert!(requests[3].has_authorization());
    }

    #[test]
    fn test_zero_interval_raised_to_minimum() {
        let (poller, _) = poller_every(MockTransport::new(), Duration::ZERO);
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);

        let (poller, _) = poller_every(MockTransport::new(), Duration::from_millis(250));
        assert_eq!(poller.interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_zero_interval_poller_runs() {
        let transport = MockTransport::new().respond(DeviceResponse::new(StatusCode::OK, PAGE));
        let (poller, metrics) = poller_every(transport, Duration::ZERO);

        let task = poller.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        assert!(metrics.encode().unwrap().contains("wattbox_up 1"));
    }

    #[tokio::test]
    async fn test_spawned_poller_runs_alongside_caller() {
        let transport = MockTransport::new().respond(DeviceResponse::new(StatusCode::OK, PAGE));
        let (poller, metrics) = poller(transport);

        let task = poller.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(metrics.encode().unwrap().contains("wattbox_voltage 119.8"));
        assert!(!task.is_finished());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
