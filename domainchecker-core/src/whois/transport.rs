use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::parser::{is_unregistered, parse_record};
use super::record::DomainRecord;
use super::servers::{get_tld, get_whois_server, IANA_WHOIS_SERVER};
use crate::error::{CheckerError, Result};

const WHOIS_PORT: u16 = 43;
/// Applied to each connect, write and read individually.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const MAX_REFERRAL_DEPTH: u8 = 3;

static REFERRAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^\s*Registrar WHOIS Server:[ \t]*(\S+)",
        r"(?im)^\s*Whois Server:[ \t]*(\S+)",
        r"(?im)^\s*ReferralServer:\s*whois://(\S+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid referral regex"))
    .collect()
});

static IANA_REFER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:refer|whois):[ \t]*(\S+)").expect("Invalid refer regex"));

/// The raw WHOIS capability: one domain in, parsed registration data out.
///
/// Implementations perform no rate limiting or retrying; `WhoisClient`
/// layers both on top.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    async fn query(&self, domain: &str) -> Result<DomainRecord>;
}

/// WHOIS over TCP port 43, following registry-to-registrar referrals.
#[derive(Debug, Clone)]
pub struct TcpWhoisTransport {
    io_timeout: Duration,
}

impl Default for TcpWhoisTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpWhoisTransport {
    pub fn new() -> Self {
        Self {
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    async fn server_for(&self, domain: &str) -> Result<String> {
        let tld = get_tld(domain).ok_or_else(|| CheckerError::Validation(domain.to_string()))?;

        if let Some(server) = get_whois_server(tld) {
            return Ok(server.to_string());
        }

        debug!(tld = %tld, "TLD not in server table, asking IANA");
        let response = self.query_server(IANA_WHOIS_SERVER, tld).await?;
        IANA_REFER
            .captures(&response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_lowercase())
            .ok_or_else(|| CheckerError::WhoisServerNotFound(tld.to_string()))
    }

    fn lookup_with_referrals<'a>(
        &'a self,
        domain: &'a str,
        server: String,
        depth: u8,
        visited: &'a mut HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            visited.insert(server.to_lowercase());
            debug!(whois_server = %server, depth, "Querying WHOIS server");

            let response = self.query_server(&server, domain).await?;

            let referral = match extract_referral(&response) {
                Some(r) if depth + 1 < MAX_REFERRAL_DEPTH && !visited.contains(&r) => r,
                _ => return Ok(response),
            };

            debug!(referral = %referral, "Following referral");
            match self
                .lookup_with_referrals(domain, referral.clone(), depth + 1, visited)
                .await
            {
                Ok(referred) if !referred.trim().is_empty() => Ok(referred),
                Ok(_) => Ok(response),
                Err(e) => {
                    // Registrar servers are flaky; the registry answer is authoritative enough.
                    warn!(referral = %referral, error = %e, "Referral lookup failed");
                    Ok(response)
                }
            }
        })
    }

    async fn query_server(&self, server: &str, query: &str) -> Result<String> {
        let addr = format!("{}:{}", server, WHOIS_PORT);

        let mut stream = timeout(self.io_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| CheckerError::Timeout(format!("Connection to {} timed out", server)))?
            .map_err(|e| CheckerError::Whois(format!("Connection to {} failed: {}", server, e)))?;

        timeout(
            self.io_timeout,
            stream.write_all(format!("{}\r\n", query).as_bytes()),
        )
        .await
        .map_err(|_| CheckerError::Timeout(format!("Write to {} timed out", server)))?
        .map_err(|e| CheckerError::Whois(format!("Failed to send query to {}: {}", server, e)))?;

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            match timeout(self.io_timeout, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    response.extend_from_slice(&buf[..n]);
                    if response.len() > MAX_RESPONSE_SIZE {
                        return Err(CheckerError::Whois(format!(
                            "Response from {} too large",
                            server
                        )));
                    }
                }
                Ok(Err(e)) => {
                    return Err(CheckerError::Whois(format!(
                        "Read from {} failed: {}",
                        server, e
                    )))
                }
                Err(_) if !response.is_empty() => break,
                Err(_) => {
                    return Err(CheckerError::Timeout(format!(
                        "Read from {} timed out",
                        server
                    )))
                }
            }
        }

        Ok(decode(response))
    }
}

#[async_trait]
impl WhoisTransport for TcpWhoisTransport {
    async fn query(&self, domain: &str) -> Result<DomainRecord> {
        let server = self.server_for(domain).await?;
        let mut visited = HashSet::new();
        let raw = self
            .lookup_with_referrals(domain, server, 0, &mut visited)
            .await?;

        let record = parse_record(domain, &raw);
        if is_unregistered(&record) {
            return Err(CheckerError::Whois(format!(
                "No registration found for {}",
                domain
            )));
        }
        Ok(record)
    }
}

/// UTF-8 when valid, otherwise Latin-1.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn extract_referral(response: &str) -> Option<String> {
    REFERRAL_PATTERNS.iter().find_map(|re| {
        re.captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().trim_end_matches('/').to_lowercase())
            .filter(|server| server.contains('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_referral() {
        let response = "Domain Name: EXAMPLE.COM\r\nRegistrar WHOIS Server: WHOIS.Registrar.Example\r\n";
        assert_eq!(
            extract_referral(response),
            Some("whois.registrar.example".to_string())
        );

        let arin = "ReferralServer: whois://whois.ripe.net\n";
        assert_eq!(extract_referral(arin), Some("whois.ripe.net".to_string()));

        assert_eq!(extract_referral("Registrar WHOIS Server: \r\n"), None);
        assert_eq!(extract_referral("Domain Name: EXAMPLE.COM\n"), None);
    }

    #[test]
    fn test_iana_refer_line() {
        let response = "% IANA WHOIS server\n\ndomain:       ZZ\nrefer:        whois.nic.zz\n";
        let server = IANA_REFER
            .captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        assert_eq!(server.as_deref(), Some("whois.nic.zz"));
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode(b"registrar: ok".to_vec()), "registrar: ok");
        assert_eq!(decode(vec![b'M', 0xfc, b'n']), "M\u{fc}n");
    }

    #[tokio::test]
    async fn test_single_label_is_rejected_without_network() {
        let transport = TcpWhoisTransport::new();
        let err = transport.query("localhost").await.unwrap_err();
        assert!(matches!(err, CheckerError::Validation(_)));
    }
}
