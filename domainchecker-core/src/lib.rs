pub mod bulk;
pub mod cache;
pub mod checker;
pub mod colors;
pub mod config;
pub mod dns;
pub mod error;
pub mod output;
pub mod rate_limit;
pub mod retry;
pub mod snapshot;
pub mod validation;
pub mod whois;

#[cfg(test)]
mod test_support;

pub use error::{CheckerError, Result};
pub use validation::{is_valid_domain, normalize_domain, validate_domain};

pub use bulk::{
    filter_expiring_soon, parse_domains_from_file, BatchChecker, BatchOutcome, ProgressCallback,
};
pub use cache::{CacheStats, CacheStore};
pub use checker::{CheckOutcome, DomainChecker};
pub use config::CheckerConfig;
pub use dns::{DnsEntry, DnsResolver, RecordType};
pub use retry::RetryPolicy;
pub use snapshot::{DomainSnapshot, DomainStatus};
pub use whois::{DomainRecord, WhoisClient};

pub use output::HumanFormatter;
