use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration data for one domain as reported by WHOIS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub registrar: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub status: Vec<String>,
    /// Unparsed server response, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl DomainRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            registrar: None,
            creation_date: None,
            expiration_date: None,
            updated_date: None,
            name_servers: Vec::new(),
            status: Vec::new(),
            raw: None,
        }
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration);
        self
    }

    pub fn with_registrar(mut self, registrar: impl Into<String>) -> Self {
        self.registrar = Some(registrar.into());
        self
    }

    /// Whole days until expiration, rounded toward negative infinity.
    /// `None` when the registry did not report an expiration date.
    pub fn days_until_expiration(&self) -> Option<i64> {
        self.days_until_expiration_at(Utc::now())
    }

    pub fn days_until_expiration_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiration_date
            .map(|exp| (exp - now).num_seconds().div_euclid(86_400))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.map(|exp| exp < now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_days_until_expiration_floors() {
        let now = Utc::now();
        let record = DomainRecord::new("example.com")
            .with_expiration(now + Duration::days(10) + Duration::hours(5));
        assert_eq!(record.days_until_expiration_at(now), Some(10));

        let lapsed = DomainRecord::new("example.com").with_expiration(now - Duration::hours(1));
        assert_eq!(lapsed.days_until_expiration_at(now), Some(-1));
        assert!(lapsed.is_expired_at(now));
    }

    #[test]
    fn test_no_expiration_date() {
        let record = DomainRecord::new("example.com");
        assert_eq!(record.days_until_expiration(), None);
        assert!(!record.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_missing_collections_deserialize_empty() {
        let record: DomainRecord = serde_json::from_str(
            r#"{"domain":"example.com","registrar":null,"creation_date":null,
                "expiration_date":null,"updated_date":null}"#,
        )
        .unwrap();
        assert!(record.name_servers.is_empty());
        assert!(record.status.is_empty());
        assert!(record.raw.is_none());
    }
}
