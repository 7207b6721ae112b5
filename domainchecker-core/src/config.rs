use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snapshot::DEFAULT_EXPIRING_THRESHOLD_DAYS;

pub const DEFAULT_CACHE_FILE: &str = "domainchecker_cache.db";

/// Every tunable of a checking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub whois_timeout: Duration,
    pub dns_timeout: Duration,
    /// Minimum gap between WHOIS requests from the shared client.
    pub whois_min_interval: Duration,
    pub dns_min_interval: Duration,
    pub check_dns: bool,
    pub expiring_threshold_days: i64,
    pub workers: usize,
    /// Pause inserted after every `workers` completions.
    pub batch_delay: Duration,
    pub cache_enabled: bool,
    pub cache_file: PathBuf,
    pub cache_ttl: Duration,
    pub retry_attempts: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            whois_timeout: Duration::from_secs(30),
            dns_timeout: Duration::from_secs(10),
            whois_min_interval: Duration::from_secs(1),
            dns_min_interval: Duration::ZERO,
            check_dns: true,
            expiring_threshold_days: DEFAULT_EXPIRING_THRESHOLD_DAYS,
            workers: 10,
            batch_delay: Duration::from_secs(1),
            cache_enabled: true,
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            cache_ttl: Duration::from_secs(3600),
            retry_attempts: 2,
        }
    }
}
