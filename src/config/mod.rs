pub mod enhance;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::common::error::DnsError;
use crate::dns::{ClientOptions, DnsClient, DnsResolver, DohJsonResolver, DohResolver, SystemResolver};

pub use types::{BackendKind, Config, LogConfig, ResolverSpec};

pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let content = load_config_content(path)?;
    let config: Config = serde_yml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// 读取配置文件并展开环境变量
pub fn load_config_content(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
    Ok(enhance::expand_env_vars(&raw))
}

/// 由描述字符串构造后端
pub fn parse_backend(spec: &str) -> Result<Arc<dyn DnsResolver>, DnsError> {
    let resolver: Arc<dyn DnsResolver> = match BackendKind::parse(spec)? {
        BackendKind::System => Arc::new(SystemResolver::new()),
        BackendKind::Doh(url) => Arc::new(
            DohResolver::new(&url).map_err(|e| DnsError::Config(e.to_string()))?,
        ),
        BackendKind::DohJson(url) => Arc::new(
            DohJsonResolver::new(&url).map_err(|e| DnsError::Config(e.to_string()))?,
        ),
    };
    Ok(resolver)
}

pub fn build_client(config: &Config) -> Result<DnsClient, DnsError> {
    config.validate()?;

    let mut options = ClientOptions::new()
        .cache_size(config.cache_size)
        .record_type_value(config.use_record_type_value);

    for (tld, spec) in &config.resolvers {
        let backends = spec
            .backends()
            .iter()
            .map(|s| parse_backend(s))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(tld = tld.as_str(), count = backends.len(), "DNS chain configured");
        options = options.resolvers(tld.clone(), backends);
    }

    Ok(DnsClient::new(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_expands_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnsmux.yaml");
        std::env::set_var("DNSMUX_TEST_COM_RESOLVER", "https://cloudflare-dns.com/dns-query");
        std::fs::write(
            &path,
            "cache-size: 32\nresolvers:\n  com: ${DNSMUX_TEST_COM_RESOLVER}\n  \".\": ${DNSMUX_TEST_NOT_SET:-system}\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache_size, 32);
        assert_eq!(
            config.resolvers["com"],
            ResolverSpec::One("https://cloudflare-dns.com/dns-query".into())
        );
        assert_eq!(config.resolvers["."], ResolverSpec::One("system".into()));

        std::env::remove_var("DNSMUX_TEST_COM_RESOLVER");
    }

    #[test]
    fn load_config_rejects_unknown_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dnsmux.yaml");
        std::fs::write(&path, "resolvers:\n  com: tls://1.1.1.1\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_is_error() {
        assert!(load_config("/nonexistent/dnsmux.yaml").is_err());
    }

    #[test]
    fn build_client_registers_chains() {
        let config: Config = serde_yml::from_str(
            "resolvers:\n  com: https://cloudflare-dns.com/dns-query\n  org:\n    - json+https://dns.google/resolve\n    - system\n",
        )
        .unwrap();
        let client = build_client(&config).unwrap();

        assert_eq!(client.registry().resolve("example.org").len(), 2);
        assert_eq!(client.registry().resolve("example.com").len(), 1);
        // 未配置通配链时自动安装系统解析器
        assert_eq!(client.registry().resolve("example.net").len(), 1);
    }

    #[test]
    fn parse_backend_rejects_bad_url() {
        assert!(matches!(parse_backend("https://"), Err(DnsError::Config(_))));
        assert!(parse_backend("system").is_ok());
    }
}
