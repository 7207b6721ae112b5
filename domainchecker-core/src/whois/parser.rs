//! Regex extraction of registration fields from free-form WHOIS text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::record::DomainRecord;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("Invalid WHOIS field regex"))
        .collect()
}

static REGISTRAR: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registrar:\s*(.+)$",
        r"(?im)^\s*Registrar Name:\s*(.+)$",
        r"(?im)^\s*Sponsoring Registrar:\s*(.+)$",
    ])
});

static CREATED: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Creation Date:\s*(.+)$",
        r"(?im)^\s*Created Date:\s*(.+)$",
        r"(?im)^\s*Created On:\s*(.+)$",
        r"(?im)^\s*Registration Date:\s*(.+)$",
        r"(?im)^\s*Registered on:\s*(.+)$",
        r"(?im)^\s*created:\s*(.+)$",
    ])
});

static EXPIRES: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registry Expiry Date:\s*(.+)$",
        r"(?im)^\s*Registrar Registration Expiration Date:\s*(.+)$",
        r"(?im)^\s*Expiration Date:\s*(.+)$",
        r"(?im)^\s*Expiry Date:\s*(.+)$",
        r"(?im)^\s*Expires On:\s*(.+)$",
        r"(?im)^\s*Expires:\s*(.+)$",
        r"(?im)^\s*paid-till:\s*(.+)$",
    ])
});

static UPDATED: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Updated Date:\s*(.+)$",
        r"(?im)^\s*Last Updated On:\s*(.+)$",
        r"(?im)^\s*Last Modified:\s*(.+)$",
        r"(?im)^\s*Last updated:\s*(.+)$",
        r"(?im)^\s*changed:\s*(.+)$",
    ])
});

static NAME_SERVERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Name Server:\s*(.+)$",
        r"(?im)^\s*Nameserver:\s*(.+)$",
        r"(?im)^\s*nserver:\s*(.+)$",
    ])
});

static STATUS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Domain Status:\s*(.+)$",
        r"(?im)^\s*Status:\s*(.+)$",
        r"(?im)^\s*state:\s*(.+)$",
    ])
});

const NOT_FOUND_MARKERS: [&str; 7] = [
    "no match for",
    "not found",
    "no data found",
    "no entries found",
    "status: free",
    "status: available",
    "no object found",
];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
];

/// Parse a raw WHOIS response into a [`DomainRecord`].
///
/// Fields the server redacted or omitted stay `None`; the raw text is
/// always retained.
pub fn parse_record(domain: &str, raw: &str) -> DomainRecord {
    DomainRecord {
        domain: domain.to_string(),
        registrar: first_match(raw, &REGISTRAR),
        creation_date: first_match(raw, &CREATED).and_then(|s| parse_date(&s)),
        expiration_date: first_match(raw, &EXPIRES).and_then(|s| parse_date(&s)),
        updated_date: first_match(raw, &UPDATED).and_then(|s| parse_date(&s)),
        name_servers: all_matches(raw, &NAME_SERVERS, |v| {
            v.split_whitespace()
                .next()
                .map(|ns| ns.trim_end_matches('.').to_lowercase())
        }),
        status: all_matches(raw, &STATUS, |v| {
            v.split_whitespace().next().map(str::to_string)
        }),
        raw: Some(raw.to_string()),
    }
}

/// True when the response carries no registration: the registry answered
/// with a "not found" marker and no parsable dates.
pub fn is_unregistered(record: &DomainRecord) -> bool {
    if record.creation_date.is_some() || record.expiration_date.is_some() {
        return false;
    }
    let lower = record.raw.as_deref().unwrap_or_default().to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m))
}

fn first_match(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|v| !v.is_empty() && !v.to_lowercase().contains("redacted"))
    })
}

fn all_matches<F>(text: &str, patterns: &[Regex], clean: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values: Vec<String> = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(text) {
            let Some(value) = caps.get(1).and_then(|m| clean(m.as_str().trim())) else {
                continue;
            };
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

pub(crate) fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let cleaned = value
        .trim()
        .trim_end_matches(" (UTC)")
        .trim_end_matches(" UTC")
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(cleaned, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.and_utc());
        }
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
