pub mod cache;
pub mod client;
pub mod doh;
pub mod doh_json;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use cache::{AnswerCache, DEFAULT_CACHE_SIZE};
pub use client::{ClientOptions, DnsClient};
pub use doh::DohResolver;
pub use doh_json::DohJsonResolver;
pub use options::{ProgressEvent, ProgressHandler, QueryOptions};
pub use registry::{ResolverChain, ResolverRegistry};
pub use resolver::SystemResolver;
pub use types::{
    convert_type, get_types, AnyRecordType, Answer, DnsResponse, Question, RecordType,
    RecordTypeLabel, DEFAULT_TTL,
};

/// DNS 解析后端 trait
///
/// `options` 中的类型已按调用方偏好规范化；实现应在取消信号触发时尽快返回，
/// 并以请求的形式（数值/标签）标注应答类型。
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, domain: &str, options: &QueryOptions) -> Result<DnsResponse>;
}
