use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::records::{DnsEntry, RecordType};
use super::transport::{DnsTransport, HickoryDnsTransport};
use crate::error::{CheckerError, Result};
use crate::rate_limit::RequestSpacer;
use crate::validation::validate_domain;

/// Default overall deadline for one record-type query.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// DNS side of the lookup gateway.
///
/// Validates input, spaces requests per instance (clones share the
/// spacing state), bounds each query with a deadline and converts every
/// transport failure into [`CheckerError::Dns`].
#[derive(Clone)]
pub struct DnsResolver {
    transport: Arc<dyn DnsTransport>,
    spacer: Arc<RequestSpacer>,
    timeout: Duration,
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver")
            .field("timeout", &self.timeout)
            .field("min_interval", &self.spacer.min_interval())
            .finish_non_exhaustive()
    }
}

impl DnsResolver {
    /// Resolver backed by hickory with no request spacing.
    pub fn new() -> Self {
        Self {
            transport: Arc::new(HickoryDnsTransport::new(DEFAULT_TIMEOUT)),
            spacer: Arc::new(RequestSpacer::new(Duration::ZERO)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn DnsTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Overall deadline for each query, on top of whatever the transport
    /// enforces internally.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.spacer = Arc::new(RequestSpacer::new(interval));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve one record type. An empty answer is not an error.
    #[instrument(skip(self), fields(domain = %domain, record_type = %record_type))]
    pub async fn resolve(&self, domain: &str, record_type: RecordType) -> Result<Vec<DnsEntry>> {
        let domain = validate_domain(domain)?;

        self.spacer.wait().await;
        let answer = timeout(self.timeout, self.transport.query(&domain, record_type)).await;
        self.spacer.mark().await;

        let answers = match answer {
            Ok(Ok(answers)) => answers,
            Ok(Err(e @ CheckerError::Dns(_))) => return Err(e),
            Ok(Err(e)) => return Err(CheckerError::Dns(e.to_string())),
            Err(_) => {
                return Err(CheckerError::Dns(format!(
                    "{} lookup for {} timed out after {}s",
                    record_type,
                    domain,
                    self.timeout.as_secs_f64()
                )))
            }
        };

        debug!(count = answers.len(), "Resolved records");
        Ok(answers
            .into_iter()
            .map(|a| DnsEntry::new(record_type, domain.clone(), a.value, a.ttl))
            .collect())
    }

    /// Resolve every type in [`RecordType::COMMON`].
    ///
    /// A failing type is logged and skipped; only an invalid domain fails
    /// the call. Entries are grouped in `COMMON` order.
    pub async fn resolve_all_common(&self, domain: &str) -> Result<Vec<DnsEntry>> {
        let normalized = validate_domain(domain)?;
        let domain = normalized.as_str();

        let lookups: Vec<_> = RecordType::COMMON
            .into_iter()
            .map(|rt| async move { (rt, self.resolve(domain, rt).await) })
            .collect();

        let mut entries = Vec::new();
        for (record_type, result) in join_all(lookups).await {
            match result {
                Ok(mut found) => entries.append(&mut found),
                Err(e) => {
                    warn!(domain = %domain, record_type = %record_type, error = %e, "Skipping record type");
                }
            }
        }
        Ok(entries)
    }
}
