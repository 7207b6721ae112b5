use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Root server queried when a TLD is missing from [`WHOIS_SERVERS`]; it
/// answers with a `refer:` line naming the registry's server.
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

pub static WHOIS_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // Legacy gTLDs
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("org", "whois.pir.org"),
        ("info", "whois.nic.info"),
        ("biz", "whois.nic.biz"),
        ("name", "whois.nic.name"),
        ("mobi", "whois.nic.mobi"),
        ("edu", "whois.educause.edu"),
        ("gov", "whois.dotgov.gov"),
        ("int", "whois.iana.org"),
        // New gTLDs
        ("app", "whois.nic.google"),
        ("dev", "whois.nic.google"),
        ("page", "whois.nic.google"),
        ("xyz", "whois.nic.xyz"),
        ("online", "whois.nic.online"),
        ("site", "whois.nic.site"),
        ("tech", "whois.nic.tech"),
        ("store", "whois.nic.store"),
        ("shop", "whois.nic.shop"),
        ("blog", "whois.nic.blog"),
        ("cloud", "whois.nic.cloud"),
        // ccTLDs
        ("io", "whois.nic.io"),
        ("co", "whois.nic.co"),
        ("me", "whois.nic.me"),
        ("tv", "whois.nic.tv"),
        ("cc", "ccwhois.verisign-grs.com"),
        ("ai", "whois.nic.ai"),
        ("us", "whois.nic.us"),
        ("uk", "whois.nic.uk"),
        ("de", "whois.denic.de"),
        ("fr", "whois.nic.fr"),
        ("nl", "whois.domain-registry.nl"),
        ("eu", "whois.eu"),
        ("ca", "whois.cira.ca"),
        ("au", "whois.auda.org.au"),
        ("jp", "whois.jprs.jp"),
        ("ru", "whois.tcinet.ru"),
        ("ch", "whois.nic.ch"),
        ("se", "whois.iis.se"),
        ("it", "whois.nic.it"),
        ("es", "whois.nic.es"),
        ("br", "whois.registro.br"),
        ("in", "whois.registry.in"),
    ])
});

pub fn get_whois_server(tld: &str) -> Option<&'static str> {
    WHOIS_SERVERS.get(tld.to_lowercase().as_str()).copied()
}

/// Last label of a domain, `None` for a single-label name.
pub fn get_tld(domain: &str) -> Option<&str> {
    let (_, tld) = domain.trim_end_matches('.').rsplit_once('.')?;
    (!tld.is_empty()).then_some(tld)
}
