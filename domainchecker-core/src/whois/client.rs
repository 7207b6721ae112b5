use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, instrument};

use super::record::DomainRecord;
use super::transport::{TcpWhoisTransport, WhoisTransport};
use crate::error::{CheckerError, Result};
use crate::rate_limit::RequestSpacer;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::validation::validate_domain;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// WHOIS side of the lookup gateway.
///
/// Every attempt, retries included, passes through the spacing gate, so a
/// client shared across workers throttles them globally.
#[derive(Clone)]
pub struct WhoisClient {
    transport: Arc<dyn WhoisTransport>,
    spacer: Arc<RequestSpacer>,
    timeout: Duration,
    retry: RetryExecutor,
}

impl Default for WhoisClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WhoisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoisClient")
            .field("timeout", &self.timeout)
            .field("min_interval", &self.spacer.min_interval())
            .field("retry", self.retry.policy())
            .finish_non_exhaustive()
    }
}

impl WhoisClient {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(TcpWhoisTransport::new()),
            spacer: Arc::new(RequestSpacer::new(DEFAULT_MIN_INTERVAL)),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryExecutor::new(RetryPolicy::default()),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn WhoisTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Deadline for a single attempt, covering referrals.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum gap between consecutive attempts from this client.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.spacer = Arc::new(RequestSpacer::new(interval));
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn lookup(&self, domain: &str) -> Result<DomainRecord> {
        let normalized = validate_domain(domain)?;
        let name = normalized.as_str();

        let result = self
            .retry
            .execute(|| async move {
                self.spacer.wait().await;
                let attempt = timeout(self.timeout, self.transport.query(name)).await;
                self.spacer.mark().await;

                attempt.map_err(|_| {
                    CheckerError::Timeout(format!(
                        "no response within {}s",
                        self.timeout.as_secs_f64()
                    ))
                })?
            })
            .await;

        match result {
            Ok(record) => {
                debug!(
                    registrar = record.registrar.as_deref().unwrap_or("-"),
                    expires = ?record.expiration_date,
                    "WHOIS lookup complete"
                );
                Ok(record)
            }
            Err(e @ CheckerError::Validation(_)) => Err(e),
            Err(CheckerError::Whois(msg)) => Err(CheckerError::Whois(format!("{}: {}", name, msg))),
            Err(e) => Err(CheckerError::Whois(format!("{}: {}", name, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubWhois;

    fn fast_client(stub: Arc<StubWhois>) -> WhoisClient {
        WhoisClient::new()
            .with_transport(stub)
            .with_min_interval(Duration::ZERO)
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_attempts(3)
                    .with_initial_delay(Duration::from_millis(1))
                    .with_jitter(false),
            )
    }

    #[tokio::test]
    async fn test_lookup_normalizes_before_query() {
        let stub = Arc::new(StubWhois::new());
        let client = fast_client(stub.clone());

        let record = client.lookup("HTTPS://www.Example.COM/").await.unwrap();
        assert_eq!(record.domain, "example.com");
        assert_eq!(stub.queried().await, vec!["example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_domain_never_reaches_transport() {
        let stub = Arc::new(StubWhois::new());
        let client = fast_client(stub.clone());

        let err = client.lookup("not_a_domain!").await.unwrap_err();
        assert!(matches!(err, CheckerError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid domain: not_a_domain!");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_whois_error() {
        let stub = Arc::new(StubWhois::new().failing("broken.com"));
        let client = fast_client(stub.clone());

        let err = client.lookup("broken.com").await.unwrap_err();
        assert!(matches!(&err, CheckerError::Whois(msg) if msg.starts_with("broken.com: ")));
        // Permanent failures are not retried.
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let stub = Arc::new(StubWhois::new().with_transient_failures(2));
        let client = fast_client(stub.clone());

        let record = client.lookup("example.com").await.unwrap();
        assert_eq!(record.domain, "example.com");
        assert_eq!(stub.call_count(), 3);
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let stub = Arc::new(StubWhois::new().with_delay(Duration::from_millis(200)));
        let client = fast_client(stub)
            .with_timeout(Duration::from_millis(20))
            .with_retry_policy(RetryPolicy::no_retry());

        let err = client.lookup("example.com").await.unwrap_err();
        assert!(matches!(&err, CheckerError::Whois(msg) if msg.contains("no response within")));
    }

    #[tokio::test]
    async fn test_spacing_covers_failed_attempts() {
        let stub = Arc::new(StubWhois::new().failing("broken.com"));
        let client = fast_client(stub).with_min_interval(Duration::from_millis(50));

        let start = std::time::Instant::now();
        let _ = client.lookup("broken.com").await;
        let _ = client.lookup("broken.com").await;
        let _ = client.lookup("example.com").await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
