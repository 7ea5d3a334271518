use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::resolver::SystemResolver;
use super::DnsResolver;

/// 通配链的键
pub const WILDCARD: &str = ".";

/// 某个 TLD 对应的有序后端列表
#[derive(Clone)]
pub struct ResolverChain(Vec<Arc<dyn DnsResolver>>);

impl ResolverChain {
    pub fn resolvers(&self) -> &[Arc<dyn DnsResolver>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Arc<dyn DnsResolver>> for ResolverChain {
    fn from(resolver: Arc<dyn DnsResolver>) -> Self {
        Self(vec![resolver])
    }
}

impl From<Vec<Arc<dyn DnsResolver>>> for ResolverChain {
    fn from(resolvers: Vec<Arc<dyn DnsResolver>>) -> Self {
        Self(resolvers)
    }
}

/// 将 `com` 规范为 `com.`
fn normalize_tld(tld: &str) -> String {
    if tld.ends_with('.') {
        tld.to_string()
    } else {
        format!("{}.", tld)
    }
}

/// 取域名最后一个标签加分隔符，`example.com` -> `com.`
pub fn tld_of(domain: &str) -> String {
    let last = domain.rsplit('.').next().unwrap_or(domain);
    format!("{}.", last)
}

/// 按 TLD 分流的后端注册表，构造完成后不可变
pub struct ResolverRegistry {
    chains: HashMap<String, ResolverChain>,
}

impl ResolverRegistry {
    /// 空链会被忽略；缺少通配链时安装系统解析器
    pub fn new<I, K>(chains: I) -> Self
    where
        I: IntoIterator<Item = (K, ResolverChain)>,
        K: AsRef<str>,
    {
        let mut map = HashMap::new();
        for (tld, chain) in chains {
            if chain.is_empty() {
                continue;
            }
            map.insert(normalize_tld(tld.as_ref()), chain);
        }

        if !map.contains_key(WILDCARD) {
            info!("no wildcard DNS chain configured, using system resolver");
            let system: Arc<dyn DnsResolver> = Arc::new(SystemResolver::new());
            map.insert(WILDCARD.to_string(), system.into());
        }

        Self { chains: map }
    }

    /// 精确匹配 TLD，未命中时回退到通配链
    pub fn resolve(&self, domain: &str) -> &[Arc<dyn DnsResolver>] {
        self.chains
            .get(&tld_of(domain))
            .or_else(|| self.chains.get(WILDCARD))
            .map(ResolverChain::resolvers)
            .unwrap_or(&[])
    }

    pub fn tlds(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }
}
