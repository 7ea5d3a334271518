pub mod error;

pub use error::{DnsError, DnsErrorKind};
