//! Domain validation and canonicalization.
//!
//! Both entry points are pure: no I/O, safe to call from any worker.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CheckerError, Result};

/// Maximum length of a domain name in presentation format.
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Labels of 1-63 alphanumerics/hyphens, no leading or trailing hyphen, joined by dots.
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)*[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$",
    )
    .expect("Invalid domain regex")
});

const SCHEMES: [&str; 2] = ["http://", "https://"];

/// Check whether `raw` names a syntactically valid domain.
///
/// Accepts bare domains as well as `http(s)://` URLs (only the host portion
/// is checked) and a leading `www.`.
pub fn is_valid_domain(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > MAX_DOMAIN_LENGTH {
        return false;
    }

    let host = strip_to_fixpoint(raw, false);
    !host.is_empty() && host.len() <= MAX_DOMAIN_LENGTH && DOMAIN_RE.is_match(&host)
}

/// Canonicalize a domain: strip scheme, path, leading `www.` and trailing
/// slashes, then lowercase.
///
/// Does not validate. Repeated application yields the same string.
pub fn normalize_domain(raw: &str) -> String {
    strip_to_fixpoint(raw, true)
}

/// Validate then normalize, as the lookup gateway does before every request.
pub fn validate_domain(raw: &str) -> Result<String> {
    if !is_valid_domain(raw) {
        return Err(CheckerError::Validation(raw.to_string()));
    }
    Ok(normalize_domain(raw))
}

fn strip_to_fixpoint(raw: &str, trim_slash: bool) -> String {
    let mut current = strip_once(raw, trim_slash);
    loop {
        let next = strip_once(&current, trim_slash);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(input: &str, trim_slash: bool) -> String {
    let mut domain = input.trim().to_lowercase();

    for scheme in SCHEMES {
        if let Some(rest) = domain.strip_prefix(scheme) {
            domain = host_portion(rest).to_string();
            break;
        }
    }

    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }

    if trim_slash {
        domain = domain.trim_end_matches('/').to_string();
    }

    domain
}

fn host_portion(rest: &str) -> &str {
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}
