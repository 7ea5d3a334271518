use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::common::error::DnsError;

use super::cache::{AnswerCache, DEFAULT_CACHE_SIZE};
use super::options::{ProgressEvent, QueryOptions};
use super::registry::{ResolverChain, ResolverRegistry};
use super::types::DnsResponse;
use super::DnsResolver;

/// 客户端构造参数
#[derive(Clone)]
pub struct ClientOptions {
    /// TLD -> 后端链，键可带或不带结尾的 `.`
    pub resolvers: Vec<(String, ResolverChain)>,
    /// 默认使用数值形式的记录类型
    pub use_record_type_value: bool,
    /// 缓存槽位上限
    pub cache_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            resolvers: Vec::new(),
            use_record_type_value: true,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(self, tld: impl Into<String>, resolver: Arc<dyn DnsResolver>) -> Self {
        self.chain(tld, ResolverChain::from(resolver))
    }

    pub fn resolvers(self, tld: impl Into<String>, resolvers: Vec<Arc<dyn DnsResolver>>) -> Self {
        self.chain(tld, ResolverChain::from(resolvers))
    }

    pub fn chain(mut self, tld: impl Into<String>, chain: ResolverChain) -> Self {
        self.resolvers.push((tld.into(), chain));
        self
    }

    pub fn record_type_value(mut self, use_record_type_value: bool) -> Self {
        self.use_record_type_value = use_record_type_value;
        self
    }

    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }
}

/// 查询入口：缓存 -> 按 TLD 选链 -> 随机顺序逐个尝试后端
///
/// 每个实例持有自己的注册表和缓存，实例之间不共享状态。
pub struct DnsClient {
    registry: ResolverRegistry,
    cache: AnswerCache,
    use_record_type_value: bool,
}

impl DnsClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            registry: ResolverRegistry::new(options.resolvers),
            cache: AnswerCache::new(options.cache_size),
            use_record_type_value: options.use_record_type_value,
        }
    }

    pub fn cache(&self) -> &AnswerCache {
        &self.cache
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub async fn query(&self, domain: &str, options: QueryOptions) -> Result<DnsResponse, DnsError> {
        let use_value = options
            .use_record_type_value
            .unwrap_or(self.use_record_type_value);
        let types = options.resolved_types(use_value);

        if options.cached {
            if let Some(response) = self.cache.get(domain, &types) {
                options.emit(ProgressEvent::Cache(&response));
                return Ok(response);
            }
        }

        let mut chain: Vec<Arc<dyn DnsResolver>> = self.registry.resolve(domain).to_vec();
        chain.shuffle(&mut rand::thread_rng());

        let backend_options = QueryOptions {
            types: Some(types.clone()),
            use_record_type_value: Some(use_value),
            ..options
        };

        let mut errors = Vec::new();
        for (attempt, resolver) in chain.iter().enumerate() {
            if backend_options.is_cancelled() {
                debug!(domain = domain, attempted = attempt, "DNS query cancelled");
                break;
            }

            debug!(domain = domain, attempt = attempt + 1, total = chain.len(), "DNS backend attempt");
            match resolver.resolve(domain, &backend_options).await {
                Ok(response) => {
                    for answer in &response.answers {
                        self.cache.add(domain, answer.clone());
                    }
                    return Ok(response.with_type_form(use_value));
                }
                Err(e) => {
                    warn!(domain = domain, error = %e, "DNS backend failed");
                    backend_options.emit(ProgressEvent::Error(&e));
                    errors.push(e);
                }
            }
        }

        if errors.len() == 1 {
            if let Some(e) = errors.pop() {
                return Err(DnsError::Backend(e));
            }
        }

        Err(DnsError::AllBackendsFailed {
            domain: domain.to_string(),
            types,
            errors,
        })
    }
}

impl Default for DnsClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}
