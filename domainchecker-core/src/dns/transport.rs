use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveError;
use hickory_resolver::proto::rr::RecordType as HickoryRecordType;
use hickory_resolver::TokioAsyncResolver;

use super::records::{DnsAnswer, RecordType};
use crate::error::{CheckerError, Result};

/// The raw DNS capability: one query type for one name.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn query(&self, domain: &str, record_type: RecordType) -> Result<Vec<DnsAnswer>>;
}

/// DNS over `hickory-resolver`, querying Google public DNS.
#[derive(Clone)]
pub struct HickoryDnsTransport {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsTransport {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 2;
        opts.use_hosts_file = false;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::google(), opts),
        }
    }
}

impl std::fmt::Debug for HickoryDnsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryDnsTransport").finish_non_exhaustive()
    }
}

fn lookup_error(record_type: RecordType, e: ResolveError) -> CheckerError {
    CheckerError::Dns(format!("{} lookup failed: {}", record_type, e))
}

#[async_trait]
impl DnsTransport for HickoryDnsTransport {
    async fn query(&self, domain: &str, record_type: RecordType) -> Result<Vec<DnsAnswer>> {
        match record_type {
            RecordType::A => {
                let response = self
                    .resolver
                    .ipv4_lookup(domain)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                let ttl = response.as_lookup().record_iter().next().map(|r| r.ttl());
                Ok(response
                    .iter()
                    .map(|addr| DnsAnswer::new(addr.to_string(), ttl))
                    .collect())
            }
            RecordType::AAAA => {
                let response = self
                    .resolver
                    .ipv6_lookup(domain)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                let ttl = response.as_lookup().record_iter().next().map(|r| r.ttl());
                Ok(response
                    .iter()
                    .map(|addr| DnsAnswer::new(addr.to_string(), ttl))
                    .collect())
            }
            RecordType::MX => {
                let response = self
                    .resolver
                    .mx_lookup(domain)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                let ttl = response.as_lookup().record_iter().next().map(|r| r.ttl());
                let mut exchanges: Vec<_> = response
                    .iter()
                    .map(|mx| (mx.preference(), mx.exchange().to_string()))
                    .collect();
                exchanges.sort();
                Ok(exchanges
                    .into_iter()
                    .map(|(pref, exchange)| DnsAnswer::new(format!("{} {}", pref, exchange), ttl))
                    .collect())
            }
            RecordType::NS => {
                let response = self
                    .resolver
                    .ns_lookup(domain)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                let ttl = response.as_lookup().record_iter().next().map(|r| r.ttl());
                Ok(response
                    .iter()
                    .map(|ns| DnsAnswer::new(ns.0.to_string(), ttl))
                    .collect())
            }
            RecordType::TXT => {
                let response = self
                    .resolver
                    .txt_lookup(domain)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                let ttl = response.as_lookup().record_iter().next().map(|r| r.ttl());
                Ok(response
                    .iter()
                    .map(|txt| {
                        let text: String = txt
                            .iter()
                            .map(|part| String::from_utf8_lossy(part).into_owned())
                            .collect();
                        DnsAnswer::new(text, ttl)
                    })
                    .collect())
            }
            RecordType::CNAME => {
                let response = self
                    .resolver
                    .lookup(domain, HickoryRecordType::CNAME)
                    .await
                    .map_err(|e| lookup_error(record_type, e))?;
                Ok(response
                    .record_iter()
                    .filter_map(|record| {
                        record
                            .data()
                            .and_then(|rdata| rdata.as_cname())
                            .map(|cname| DnsAnswer::new(cname.0.to_string(), Some(record.ttl())))
                    })
                    .collect())
            }
        }
    }
}
