mod client;
mod parser;
mod record;
mod servers;
mod transport;

pub use client::WhoisClient;
pub use parser::parse_record;
pub use record::DomainRecord;
pub use servers::{get_tld, get_whois_server};
pub use transport::{TcpWhoisTransport, WhoisTransport};
