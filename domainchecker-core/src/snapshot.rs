use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dns::DnsEntry;
use crate::whois::DomainRecord;

/// Default window, in days, for a domain to count as expiring soon.
pub const DEFAULT_EXPIRING_THRESHOLD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Active,
    Expired,
    ExpiringSoon,
    Unknown,
    Error,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Active => "active",
            DomainStatus::Expired => "expired",
            DomainStatus::ExpiringSoon => "expiring_soon",
            DomainStatus::Unknown => "unknown",
            DomainStatus::Error => "error",
        }
    }

    /// Classify a registration as of `now`.
    ///
    /// Expired when the expiration date is in the past, expiring soon when
    /// it falls within `threshold_days`, otherwise active. Without any
    /// registration data the status is unknown.
    pub fn classify(
        record: Option<&DomainRecord>,
        now: DateTime<Utc>,
        threshold_days: i64,
    ) -> Self {
        let Some(record) = record else {
            return DomainStatus::Unknown;
        };

        if record.is_expired_at(now) {
            return DomainStatus::Expired;
        }

        match record.days_until_expiration_at(now) {
            Some(days) if days <= threshold_days => DomainStatus::ExpiringSoon,
            _ => DomainStatus::Active,
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consolidated WHOIS, DNS and status view of a domain at one instant.
///
/// This is also the cache payload, so every field has a fixed type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub domain: String,
    pub whois: Option<DomainRecord>,
    #[serde(default)]
    pub dns_records: Vec<DnsEntry>,
    pub status: DomainStatus,
    pub last_checked: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DomainSnapshot {
    pub fn new(domain: impl Into<String>, status: DomainStatus) -> Self {
        Self {
            domain: domain.into(),
            whois: None,
            dns_records: Vec::new(),
            status,
            last_checked: Utc::now(),
            error: None,
        }
    }

    pub fn registrar(&self) -> Option<&str> {
        self.whois.as_ref().and_then(|w| w.registrar.as_deref())
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.whois.as_ref().and_then(|w| w.expiration_date)
    }

    /// Days left until expiration, measured from now.
    pub fn expires_in_days(&self) -> Option<i64> {
        self.whois.as_ref().and_then(|w| w.days_until_expiration())
    }

    /// True when an expiration date exists and lies within
    /// `threshold_days` from now. Already-expired domains qualify.
    pub fn is_expiring_soon(&self, threshold_days: i64) -> bool {
        self.expires_in_days()
            .map(|days| days <= threshold_days)
            .unwrap_or(false)
    }
}
