use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::config::CheckerConfig;
use crate::dns::DnsResolver;
use crate::error::CheckerError;
use crate::retry::RetryPolicy;
use crate::snapshot::{DomainSnapshot, DomainStatus, DEFAULT_EXPIRING_THRESHOLD_DAYS};
use crate::validation::{is_valid_domain, normalize_domain};
use crate::whois::WhoisClient;

/// Result of checking one domain. Built once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub domain: String,
    pub success: bool,
    pub snapshot: Option<DomainSnapshot>,
    pub error: Option<String>,
    pub duration: Duration,
    /// Served from the cache store without a fresh lookup.
    pub cached: bool,
}

impl CheckOutcome {
    pub fn succeeded(domain: impl Into<String>, snapshot: DomainSnapshot, duration: Duration) -> Self {
        Self {
            domain: domain.into(),
            success: true,
            snapshot: Some(snapshot),
            error: None,
            duration,
            cached: false,
        }
    }

    pub fn failed(domain: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            domain: domain.into(),
            success: false,
            snapshot: None,
            error: Some(error.into()),
            duration,
            cached: false,
        }
    }

    pub fn from_cache(domain: impl Into<String>, snapshot: DomainSnapshot, duration: Duration) -> Self {
        Self {
            cached: true,
            ..Self::succeeded(domain, snapshot, duration)
        }
    }

    pub fn status(&self) -> DomainStatus {
        self.snapshot
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(DomainStatus::Error)
    }

    pub fn days_until_expiration(&self) -> Option<i64> {
        self.snapshot.as_ref().and_then(|s| s.expires_in_days())
    }
}

/// Composes the WHOIS and DNS gateways into one consolidated check.
///
/// Holds no cache; `BatchChecker` decides when to consult one.
#[derive(Debug, Clone)]
pub struct DomainChecker {
    whois: WhoisClient,
    dns: DnsResolver,
    check_dns: bool,
    expiring_threshold_days: i64,
}

impl Default for DomainChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainChecker {
    pub fn new() -> Self {
        Self {
            whois: WhoisClient::new(),
            dns: DnsResolver::new(),
            check_dns: true,
            expiring_threshold_days: DEFAULT_EXPIRING_THRESHOLD_DAYS,
        }
    }

    pub fn from_config(config: &CheckerConfig) -> Self {
        let whois = WhoisClient::new()
            .with_timeout(config.whois_timeout)
            .with_min_interval(config.whois_min_interval)
            .with_retry_policy(RetryPolicy::new().with_max_attempts(config.retry_attempts));
        let dns = DnsResolver::new()
            .with_timeout(config.dns_timeout)
            .with_min_interval(config.dns_min_interval);

        Self::new()
            .with_whois_client(whois)
            .with_dns_resolver(dns)
            .with_dns(config.check_dns)
            .with_expiring_threshold(config.expiring_threshold_days)
    }

    pub fn with_whois_client(mut self, whois: WhoisClient) -> Self {
        self.whois = whois;
        self
    }

    pub fn with_dns_resolver(mut self, dns: DnsResolver) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_dns(mut self, check_dns: bool) -> Self {
        self.check_dns = check_dns;
        self
    }

    pub fn with_expiring_threshold(mut self, days: i64) -> Self {
        self.expiring_threshold_days = days;
        self
    }

    pub fn expiring_threshold(&self) -> i64 {
        self.expiring_threshold_days
    }

    /// Check one domain end to end. Never fails: every error is captured
    /// in the returned outcome.
    #[instrument(skip(self), fields(domain = %domain))]
    pub async fn check(&self, domain: &str) -> CheckOutcome {
        let start = Instant::now();

        if !is_valid_domain(domain) {
            return CheckOutcome::failed(
                domain,
                CheckerError::Validation(domain.to_string()).to_string(),
                start.elapsed(),
            );
        }
        let domain = normalize_domain(domain);

        let record = match self.whois.lookup(&domain).await {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "WHOIS lookup failed");
                return CheckOutcome::failed(domain, e.to_string(), start.elapsed());
            }
        };

        let dns_records = if self.check_dns {
            self.dns.resolve_all_common(&domain).await.unwrap_or_else(|e| {
                warn!(error = %e, "DNS resolution failed");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let now = Utc::now();
        let status = DomainStatus::classify(Some(&record), now, self.expiring_threshold_days);

        let snapshot = DomainSnapshot {
            domain: domain.clone(),
            whois: Some(record),
            dns_records,
            status,
            last_checked: now,
            error: None,
        };

        debug!(status = %status, "Check complete");
        CheckOutcome::succeeded(domain, snapshot, start.elapsed())
    }

    /// False when the check itself fails.
    pub async fn is_domain_expiring_soon(&self, domain: &str, threshold_days: i64) -> bool {
        self.check(domain)
            .await
            .snapshot
            .map(|s| s.is_expiring_soon(threshold_days))
            .unwrap_or(false)
    }

    pub async fn get_expiration_date(&self, domain: &str) -> Option<DateTime<Utc>> {
        self.check(domain)
            .await
            .snapshot
            .and_then(|s| s.expiration_date())
    }
}
