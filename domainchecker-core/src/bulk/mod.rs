mod executor;

pub use executor::{
    filter_expiring_soon, parse_domains_from_file, BatchChecker, BatchOutcome, ProgressCallback,
};
