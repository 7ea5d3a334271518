use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::proto::rr::{RData, Record, RecordType as WireType};
use hickory_resolver::TokioAsyncResolver;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::options::{cancellable, QueryOptions};
use super::types::{AnyRecordType, Answer, DnsResponse, Question};
use super::DnsResolver;

/// 系统 DNS 解析器（读取系统解析配置，使用 hickory-resolver）
///
/// 底层解析器在首次查询时创建，因此构造本身不会失败。
pub struct SystemResolver {
    resolver: OnceCell<TokioAsyncResolver>,
}

impl SystemResolver {
    pub fn new() -> Self {
        Self {
            resolver: OnceCell::new(),
        }
    }

    async fn resolver(&self) -> Result<&TokioAsyncResolver> {
        self.resolver
            .get_or_try_init(|| async {
                let resolver = TokioAsyncResolver::tokio_from_system_conf()?;
                info!("system DNS resolver created");
                Ok::<_, anyhow::Error>(resolver)
            })
            .await
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, domain: &str, options: &QueryOptions) -> Result<DnsResponse> {
        let types = options.resolved_types(options.use_record_type_value());
        let resolver = self.resolver().await?;

        // 各类型并发查询
        let lookups = types
            .iter()
            .map(|&record_type| lookup_type(resolver, domain, record_type));
        let answers = cancellable(options.signal.as_ref(), try_join_all(lookups)).await?;
        let answers: Vec<Answer> = answers.into_iter().flatten().collect();

        debug!(domain = domain, count = answers.len(), "system DNS resolved");

        let questions = types.iter().map(|t| Question::new(domain, *t)).collect();
        Ok(DnsResponse::new(questions, answers))
    }
}

async fn lookup_type(
    resolver: &TokioAsyncResolver,
    domain: &str,
    record_type: AnyRecordType,
) -> Result<Vec<Answer>> {
    let wanted = WireType::from(record_type.to_value().code());
    let lookup = match resolver.lookup(domain, wanted).await {
        Ok(lookup) => lookup,
        // 某一类型无记录不影响其余类型
        Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
            debug!(domain = domain, record_type = %record_type, "no records");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    // CNAME 链上的记录也会出现在结果中，只保留请求的类型
    let answers = lookup
        .record_iter()
        .filter(|record| record.record_type() == wanted)
        .flat_map(|record| {
            let ttl = record.ttl();
            record_data(record)
                .into_iter()
                .map(move |data| Answer::new(domain, record_type, data).with_ttl(ttl))
        })
        .collect();
    Ok(answers)
}

/// 记录数据的文本形式；TXT 的每个字符串各占一条
pub(crate) fn record_data(record: &Record) -> Vec<String> {
    match record.data() {
        Some(RData::A(a)) => vec![a.to_string()],
        Some(RData::AAAA(aaaa)) => vec![aaaa.to_string()],
        Some(RData::CNAME(cname)) => vec![trim_root(&cname.0.to_utf8())],
        Some(RData::TXT(txt)) => txt
            .txt_data()
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect(),
        Some(other) => vec![other.to_string()],
        None => Vec::new(),
    }
}

pub(crate) fn trim_root(name: &str) -> String {
    if name.len() > 1 {
        name.trim_end_matches('.').to_string()
    } else {
        name.to_string()
    }
}
