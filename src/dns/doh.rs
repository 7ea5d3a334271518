//! DNS-over-HTTPS 后端（RFC 8484，`application/dns-message`）
//!
//! 查询报文以 GET 方式、base64url 编码后放在 `dns` 参数中发送。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query};
use hickory_resolver::proto::rr::{Name, RecordType as WireType};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::options::{cancellable, ProgressEvent, QueryOptions};
use super::resolver::{record_data, trim_root};
use super::types::{AnyRecordType, Answer, DnsResponse, Question, RecordType};
use super::DnsResolver;

/// 同时在途的 HTTP 查询上限
pub const DEFAULT_QUERY_CONCURRENCY: usize = 4;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DohResolver {
    url: reqwest::Url,
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl DohResolver {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_concurrency(url, DEFAULT_QUERY_CONCURRENCY)
    }

    pub fn with_concurrency(url: &str, query_concurrency: usize) -> Result<Self> {
        let url = parse_https_url(url)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        info!(url = %url, "DoH resolver created");
        Ok(Self {
            url,
            client,
            permits: Arc::new(Semaphore::new(query_concurrency.max(1))),
        })
    }

    async fn fetch(&self, query: &str) -> Result<Vec<u8>> {
        let _permit = self.permits.acquire().await?;
        debug!(url = %self.url, "GET dns-message");

        let res = self
            .client
            .get(self.url.clone())
            .query(&[("dns", query)])
            .header(ACCEPT, "application/dns-message")
            .send()
            .await?;

        debug!(url = %res.url(), status = res.status().as_u16(), "dns-message response");
        check_status(res.status())?;

        Ok(res.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DnsResolver for DohResolver {
    async fn resolve(&self, domain: &str, options: &QueryOptions) -> Result<DnsResponse> {
        let use_value = options.use_record_type_value();
        let types = options.resolved_types(use_value);
        let query = URL_SAFE_NO_PAD.encode(encode_query(domain, &types)?);

        options.emit(ProgressEvent::Query(domain));

        let body = cancellable(options.signal.as_ref(), self.fetch(&query)).await?;
        let response = decode_response(&body, use_value)?;

        options.emit(ProgressEvent::Response(&response));
        Ok(response)
    }
}

pub(crate) fn parse_https_url(url: &str) -> Result<reqwest::Url> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| anyhow::anyhow!("invalid DoH URL '{}': {}", url, e))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        anyhow::bail!("DoH URL must use http(s): {}", url);
    }
    if parsed.host_str().is_none() {
        anyhow::bail!("DoH URL missing host: {}", url);
    }
    Ok(parsed)
}

pub(crate) fn check_status(status: StatusCode) -> Result<()> {
    if status != StatusCode::OK {
        anyhow::bail!(
            "Unexpected HTTP status: {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );
    }
    Ok(())
}

/// id 为 0、期望递归，每个类型一个问题
pub(crate) fn encode_query(domain: &str, types: &[AnyRecordType]) -> Result<Vec<u8>> {
    let name = Name::from_ascii(domain)?;
    let mut message = Message::new();
    message
        .set_id(0)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);

    for record_type in types {
        let wire = WireType::from(record_type.to_value().code());
        message.add_query(Query::query(name.clone(), wire));
    }

    Ok(message.to_vec()?)
}

/// 不在支持集合内的记录（如 DNSSEC 签名）会被跳过
pub(crate) fn decode_response(body: &[u8], use_record_type_value: bool) -> Result<DnsResponse> {
    let message = Message::from_vec(body)?;
    let header = message.header();

    let questions = message
        .queries()
        .iter()
        .filter_map(|query| {
            let record_type = RecordType::try_from(u16::from(query.query_type())).ok()?;
            Some(Question::new(
                trim_root(&query.name().to_utf8()),
                AnyRecordType::from(record_type).convert(use_record_type_value),
            ))
        })
        .collect();

    let mut answers = Vec::new();
    for record in message.answers() {
        let Ok(record_type) = RecordType::try_from(u16::from(record.record_type())) else {
            debug!(record_type = %record.record_type(), "skipping unsupported answer");
            continue;
        };
        let record_type = AnyRecordType::from(record_type).convert(use_record_type_value);
        let name = trim_root(&record.name().to_utf8());
        for data in record_data(record) {
            answers.push(Answer::new(name.clone(), record_type, data).with_ttl(record.ttl()));
        }
    }

    Ok(DnsResponse {
        status: u16::from(header.response_code()),
        truncated: header.truncated(),
        recursion_desired: header.recursion_desired(),
        recursion_available: header.recursion_available(),
        authentic_data: header.authentic_data(),
        checking_disabled: header.checking_disabled(),
        questions,
        answers,
    })
}
