//! 按 TLD 分流、带 TTL 缓存与后端回退的 DNS 查询库

pub mod common;
pub mod config;
pub mod dns;

pub use common::error::{DnsError, DnsErrorKind};
pub use dns::{ClientOptions, DnsClient, DnsResolver, QueryOptions};
