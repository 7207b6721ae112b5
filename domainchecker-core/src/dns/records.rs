use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CheckerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    MX,
    NS,
    TXT,
    CNAME,
}

impl RecordType {
    /// The types queried when checking a domain, in query order.
    pub const COMMON: [RecordType; 6] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::MX,
        RecordType::NS,
        RecordType::TXT,
        RecordType::CNAME,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::MX => "MX",
            RecordType::NS => "NS",
            RecordType::TXT => "TXT",
            RecordType::CNAME => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CheckerError;

    fn from_str(s: &str) -> Result<Self> {
        RecordType::COMMON
            .into_iter()
            .find(|rt| rt.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CheckerError::Dns(format!("unsupported record type: {}", s)))
    }
}

/// One resolved record.
///
/// `value` is the presentation form: an address for A/AAAA, a target
/// name for NS/CNAME, `"<preference> <exchange>"` for MX and the joined
/// character strings for TXT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsEntry {
    pub record_type: RecordType,
    pub name: String,
    pub value: String,
    pub ttl: Option<u32>,
}

impl DnsEntry {
    pub fn new(
        record_type: RecordType,
        name: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<u32>,
    ) -> Self {
        Self {
            record_type,
            name: name.into(),
            value: value.into(),
            ttl,
        }
    }
}

/// A single value returned by a DNS transport, before the owner name and
/// type are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    pub value: String,
    pub ttl: Option<u32>,
}

impl DnsAnswer {
    pub fn new(value: impl Into<String>, ttl: Option<u32>) -> Self {
        Self {
            value: value.into(),
            ttl,
        }
    }
}
