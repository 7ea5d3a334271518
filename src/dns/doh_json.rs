//! DNS-JSON-over-HTTPS 后端（`application/dns-json`）
//!
//! 兼容 Google / Cloudflare 的 JSON 应答格式，依赖比 wire 格式更少。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::doh::{check_status, parse_https_url, DEFAULT_QUERY_CONCURRENCY};
use super::options::{cancellable, ProgressEvent, QueryOptions};
use super::types::{AnyRecordType, Answer, DnsResponse, Question, RecordType};
use super::DnsResolver;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct JsonResponse {
    #[serde(rename = "Status", default)]
    status: u16,
    #[serde(rename = "TC", default)]
    truncated: bool,
    #[serde(rename = "RD", default)]
    recursion_desired: bool,
    #[serde(rename = "RA", default)]
    recursion_available: bool,
    #[serde(rename = "AD", default)]
    authentic_data: bool,
    #[serde(rename = "CD", default)]
    checking_disabled: bool,
    #[serde(rename = "Question", default)]
    questions: Vec<JsonQuestion>,
    #[serde(rename = "Answer", default)]
    answers: Vec<JsonAnswer>,
}

#[derive(Debug, Deserialize)]
struct JsonQuestion {
    name: String,
    #[serde(rename = "type")]
    record_type: u16,
}

#[derive(Debug, Deserialize)]
struct JsonAnswer {
    name: String,
    #[serde(rename = "type")]
    record_type: u16,
    #[serde(rename = "TTL", default)]
    ttl: Option<u32>,
    data: String,
}

pub struct DohJsonResolver {
    url: reqwest::Url,
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl DohJsonResolver {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_concurrency(url, DEFAULT_QUERY_CONCURRENCY)
    }

    pub fn with_concurrency(url: &str, query_concurrency: usize) -> Result<Self> {
        let url = parse_https_url(url)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        info!(url = %url, "DoH JSON resolver created");
        Ok(Self {
            url,
            client,
            permits: Arc::new(Semaphore::new(query_concurrency.max(1))),
        })
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<String> {
        let _permit = self.permits.acquire().await?;

        let res = self
            .client
            .get(self.url.clone())
            .query(params)
            .header(ACCEPT, "application/dns-json")
            .send()
            .await?;

        debug!(url = %res.url(), status = res.status().as_u16(), "dns-json response");
        check_status(res.status())?;

        Ok(res.text().await?)
    }
}

#[async_trait]
impl DnsResolver for DohJsonResolver {
    async fn resolve(&self, domain: &str, options: &QueryOptions) -> Result<DnsResponse> {
        let use_value = options.use_record_type_value();
        let types = options.resolved_types(use_value);

        let mut params = vec![("name", domain.to_string())];
        params.extend(types.iter().map(|t| ("type", t.to_string())));

        options.emit(ProgressEvent::Query(domain));

        let body = cancellable(options.signal.as_ref(), self.fetch(&params)).await?;
        let response = parse_response(&body, use_value)?;

        options.emit(ProgressEvent::Response(&response));
        Ok(response)
    }
}

fn supported(code: u16, use_record_type_value: bool) -> Option<AnyRecordType> {
    match RecordType::try_from(code) {
        Ok(t) => Some(AnyRecordType::from(t).convert(use_record_type_value)),
        Err(_) => {
            debug!(record_type = code, "skipping unsupported record type");
            None
        }
    }
}

fn parse_response(body: &str, use_record_type_value: bool) -> Result<DnsResponse> {
    let raw: JsonResponse = serde_json::from_str(body)?;

    let questions = raw
        .questions
        .into_iter()
        .filter_map(|q| {
            let record_type = supported(q.record_type, use_record_type_value)?;
            Some(Question::new(q.name, record_type))
        })
        .collect();

    let answers = raw
        .answers
        .into_iter()
        .filter_map(|a| {
            let record_type = supported(a.record_type, use_record_type_value)?;
            Some(Answer {
                name: a.name,
                record_type,
                data: a.data,
                ttl: a.ttl,
            })
        })
        .collect();

    Ok(DnsResponse {
        status: raw.status,
        truncated: raw.truncated,
        recursion_desired: raw.recursion_desired,
        recursion_available: raw.recursion_available,
        authentic_data: raw.authentic_data,
        checking_disabled: raw.checking_disabled,
        questions,
        answers,
    })
}
