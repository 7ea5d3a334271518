use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::types::{get_types, AnyRecordType, DnsResponse};

/// 查询过程中的观测事件，不影响控制流
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// `dns:cache` 缓存命中，携带返回的结果
    Cache(&'a DnsResponse),
    /// `dns:error` 某个后端失败
    Error(&'a anyhow::Error),
    /// `dns:query` 后端即将发出查询
    Query(&'a str),
    /// `dns:response` 后端收到应答
    Response(&'a DnsResponse),
}

impl ProgressEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Cache(_) => "dns:cache",
            ProgressEvent::Error(_) => "dns:error",
            ProgressEvent::Query(_) => "dns:query",
            ProgressEvent::Response(_) => "dns:response",
        }
    }
}

pub type ProgressHandler = Arc<dyn Fn(ProgressEvent<'_>) + Send + Sync>;

/// 单次查询的选项，也会原样（类型已规范化）传给后端
#[derive(Clone)]
pub struct QueryOptions {
    /// 请求的类型；`None` 或空表示默认类型
    pub types: Option<Vec<AnyRecordType>>,
    /// 为 false 时跳过缓存读取
    pub cached: bool,
    /// 覆盖客户端默认的数值/标签形式偏好
    pub use_record_type_value: Option<bool>,
    pub signal: Option<CancellationToken>,
    pub on_progress: Option<ProgressHandler>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            types: None,
            cached: true,
            use_record_type_value: None,
            signal: None,
            on_progress: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AnyRecordType>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_type(self, record_type: impl Into<AnyRecordType>) -> Self {
        self.with_types([record_type.into()])
    }

    pub fn uncached(mut self) -> Self {
        self.cached = false;
        self
    }

    pub fn with_record_type_value(mut self, use_record_type_value: bool) -> Self {
        self.use_record_type_value = Some(use_record_type_value);
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_progress<F>(mut self, handler: F) -> Self
    where
        F: Fn(ProgressEvent<'_>) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(handler));
        self
    }

    /// 按给定默认偏好规范化后的类型列表
    pub fn resolved_types(&self, default_use_value: bool) -> Vec<AnyRecordType> {
        get_types(
            self.types.as_deref(),
            self.use_record_type_value.unwrap_or(default_use_value),
        )
    }

    pub fn use_record_type_value(&self) -> bool {
        self.use_record_type_value.unwrap_or(true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.is_cancelled())
    }

    pub fn emit(&self, event: ProgressEvent<'_>) {
        if let Some(handler) = &self.on_progress {
            handler(event);
        }
    }
}

impl std::fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOptions")
            .field("types", &self.types)
            .field("cached", &self.cached)
            .field("use_record_type_value", &self.use_record_type_value)
            .field("cancelled", &self.is_cancelled())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// 在取消信号触发时提前结束 `fut`
pub async fn cancellable<F, T>(signal: Option<&CancellationToken>, fut: F) -> anyhow::Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match signal {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => anyhow::bail!("query aborted"),
            result = fut => result,
        },
        None => fut.await,
    }
}
