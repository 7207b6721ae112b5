mod records;
mod resolver;
mod transport;

pub use records::{DnsAnswer, DnsEntry, RecordType};
pub use resolver::DnsResolver;
pub use transport::{DnsTransport, HickoryDnsTransport};
