//! In-process stand-ins for the WHOIS and DNS transports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;

use crate::dns::{DnsAnswer, DnsTransport, RecordType};
use crate::error::{CheckerError, Result};
use crate::whois::{DomainRecord, WhoisTransport};

/// Answers every domain with a registration expiring in a year unless told
/// otherwise.
#[derive(Default)]
pub struct StubWhois {
    records: HashMap<String, DomainRecord>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delay: Duration,
    transient_failures: AtomicUsize,
    calls: AtomicUsize,
    queried: RwLock<Vec<String>>,
}

impl StubWhois {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: DomainRecord) -> Self {
        self.records.insert(record.domain.clone(), record);
        self
    }

    pub fn failing(mut self, domain: &str) -> Self {
        self.failing.insert(domain.to_string());
        self
    }

    pub fn panicking(mut self, domain: &str) -> Self {
        self.panicking.insert(domain.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The first `count` calls fail with a timeout.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn queried(&self) -> Vec<String> {
        self.queried.read().await.clone()
    }
}

#[async_trait]
impl WhoisTransport for StubWhois {
    async fn query(&self, domain: &str) -> Result<DomainRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried.write().await.push(domain.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CheckerError::Timeout("stub read timed out".to_string()));
        }
        if self.panicking.contains(domain) {
            panic!("stub transport panicked for {}", domain);
        }
        if self.failing.contains(domain) {
            return Err(CheckerError::Whois(format!(
                "No registration found for {}",
                domain
            )));
        }

        Ok(self.records.get(domain).cloned().unwrap_or_else(|| {
            DomainRecord::new(domain)
                .with_registrar("Stub Registrar, Inc.")
                .with_expiration(Utc::now() + ChronoDuration::days(365))
        }))
    }
}

/// Answers A and MX, fails every other type.
#[derive(Default)]
pub struct StubDns {
    fail_all: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_everything(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsTransport for StubDns {
    async fn query(&self, domain: &str, record_type: RecordType) -> Result<Vec<DnsAnswer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match record_type {
            _ if self.fail_all => Err(CheckerError::Dns("stub SERVFAIL".to_string())),
            RecordType::A => Ok(vec![DnsAnswer::new("192.0.2.1", Some(300))]),
            RecordType::MX => Ok(vec![DnsAnswer::new(format!("10 mail.{}.", domain), Some(3600))]),
            other => Err(CheckerError::Dns(format!("no {} records for {}", other, domain))),
        }
    }
}
