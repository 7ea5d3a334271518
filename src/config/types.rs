use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::error::DnsError;
use crate::dns::DEFAULT_CACHE_SIZE;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_use_record_type_value")]
    pub use_record_type_value: bool,
    /// TLD -> 后端描述；未配置 `.` 时使用系统解析器
    #[serde(default)]
    pub resolvers: BTreeMap<String, ResolverSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            use_record_type_value: true,
            resolvers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.cache_size == 0 {
            return Err(DnsError::Config("cache-size must be greater than 0".into()));
        }
        for (tld, spec) in &self.resolvers {
            let backends = spec.backends();
            if backends.is_empty() {
                return Err(DnsError::Config(format!("resolver list for '{}' is empty", tld)));
            }
            for backend in backends {
                BackendKind::parse(backend)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_use_record_type_value() -> bool {
    true
}

/// 单个后端或有序后端列表
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResolverSpec {
    One(String),
    Many(Vec<String>),
}

impl ResolverSpec {
    pub fn backends(&self) -> &[String] {
        match self {
            ResolverSpec::One(spec) => std::slice::from_ref(spec),
            ResolverSpec::Many(specs) => specs,
        }
    }
}

/// 后端描述字符串解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// `system`
    System,
    /// `https://...`，RFC 8484 wire 格式
    Doh(String),
    /// `json+https://...`
    DohJson(String),
}

impl BackendKind {
    pub fn parse(spec: &str) -> Result<Self, DnsError> {
        let spec = spec.trim();
        if spec.eq_ignore_ascii_case("system") {
            return Ok(BackendKind::System);
        }
        if let Some(url) = spec.strip_prefix("json+") {
            if url.starts_with("https://") || url.starts_with("http://") {
                return Ok(BackendKind::DohJson(url.to_string()));
            }
        }
        if spec.starts_with("https://") || spec.starts_with("http://") {
            return Ok(BackendKind::Doh(spec.to_string()));
        }
        Err(DnsError::Config(format!("unknown resolver '{}'", spec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_kinds() {
        assert_eq!(BackendKind::parse("system").unwrap(), BackendKind::System);
        assert_eq!(
            BackendKind::parse("https://cloudflare-dns.com/dns-query").unwrap(),
            BackendKind::Doh("https://cloudflare-dns.com/dns-query".into())
        );
        assert_eq!(
            BackendKind::parse("json+https://dns.google/resolve").unwrap(),
            BackendKind::DohJson("https://dns.google/resolve".into())
        );
    }

    #[test]
    fn unknown_backend_is_config_error() {
        let err = BackendKind::parse("udp://8.8.8.8").unwrap_err();
        assert!(matches!(err, DnsError::Config(_)));
        assert!(BackendKind::parse("json+udp://8.8.8.8").is_err());
    }

    #[test]
    fn defaults_when_keys_missing() {
        let config: Config = serde_yml::from_str("{}").unwrap();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.cache_size, DEFAULT_CACHE_SIZE);
        assert!(config.use_record_type_value);
        assert!(config.resolvers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn single_and_list_resolvers() {
        let yaml = r#"
cache-size: 16
use-record-type-value: false
resolvers:
  com: https://cloudflare-dns.com/dns-query
  ".":
    - system
    - json+https://dns.google/resolve
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.cache_size, 16);
        assert!(!config.use_record_type_value);
        assert_eq!(config.resolvers["com"].backends().len(), 1);
        assert_eq!(
            config.resolvers["."],
            ResolverSpec::Many(vec!["system".into(), "json+https://dns.google/resolve".into()])
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_cache_size_rejected() {
        let config: Config = serde_yml::from_str("cache-size: 0").unwrap();
        assert!(matches!(config.validate(), Err(DnsError::Config(_))));
    }

    #[test]
    fn empty_resolver_list_rejected() {
        let config: Config = serde_yml::from_str("resolvers:\n  com: []\n").unwrap();
        assert!(config.validate().is_err());
    }
}
