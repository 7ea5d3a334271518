use thiserror::Error;

use crate::dns::AnyRecordType;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("unsupported DNS record type: {0}")]
    UnsupportedRecordType(String),

    #[error("config error: {0}")]
    Config(String),

    /// Exactly one backend was attempted and it failed.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("DNS lookup of {domain} {} failed", format_types(.types))]
    AllBackendsFailed {
        domain: String,
        types: Vec<AnyRecordType>,
        errors: Vec<anyhow::Error>,
    },
}

fn format_types(types: &[AnyRecordType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl DnsError {
    /// Underlying backend failures, in the order they were attempted.
    pub fn errors(&self) -> Vec<&anyhow::Error> {
        match self {
            DnsError::Backend(e) => vec![e],
            DnsError::AllBackendsFailed { errors, .. } => errors.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the caller may reasonably retry the same query.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn kind(&self) -> DnsErrorKind {
        match self {
            DnsError::UnsupportedRecordType(_) => DnsErrorKind::UnsupportedRecordType,
            DnsError::Config(_) => DnsErrorKind::Config,
            DnsError::Backend(_) => DnsErrorKind::Backend,
            DnsError::AllBackendsFailed { .. } => DnsErrorKind::AllBackendsFailed,
        }
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsErrorKind {
    UnsupportedRecordType,
    Config,
    Backend,
    AllBackendsFailed,
}

impl DnsErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            DnsErrorKind::Backend | DnsErrorKind::AllBackendsFailed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DnsErrorKind::UnsupportedRecordType => "UNSUPPORTED_TYPE",
            DnsErrorKind::Config => "CONFIG",
            DnsErrorKind::Backend => "BACKEND",
            DnsErrorKind::AllBackendsFailed => "ALL_FAILED",
        }
    }
}
