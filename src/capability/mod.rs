//! 外部能力接口 - 搜索、LLM、向量嵌入
//!
//! 流水线各阶段只依赖这里的trait，不感知具体厂商API。

use thiserror::Error;

pub mod embedding;
pub mod llm;
pub mod mock;
pub mod search;

pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider, NeighborHit};
pub use llm::{HttpLlmProvider, LlmProvider};
pub use search::{HttpSearchProvider, SearchProvider};

/// 能力调用错误分类
///
/// 可重试：限流、服务不可用、超时。不可重试：内容拦截、坏输入、输出损坏。
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("capability call timed out after {0}s")]
    Timeout(u64),

    #[error("content filtered by provider: {0}")]
    ContentFiltered(String),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CapabilityError {
    /// 该错误是否值得退避重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CapabilityError::RateLimited(_)
                | CapabilityError::Unavailable(_)
                | CapabilityError::Timeout(_)
        )
    }
}

/// 将HTTP响应状态映射到能力错误分类
pub(crate) fn classify_http_status(status: reqwest::StatusCode, body: &str) -> CapabilityError {
    if status.as_u16() == 429 {
        return CapabilityError::RateLimited(body.chars().take(200).collect());
    }
    if status.is_server_error() {
        return CapabilityError::Unavailable(format!("{}: {}", status, truncate(body, 200)));
    }
    if body.contains("content_filter") || body.contains("content_policy") {
        return CapabilityError::ContentFiltered(truncate(body, 200));
    }
    CapabilityError::BadInput(format!("{}: {}", status, truncate(body, 200)))
}

/// 将reqwest传输层错误映射到能力错误分类
pub(crate) fn classify_transport_error(err: reqwest::Error, timeout_seconds: u64) -> CapabilityError {
    if err.is_timeout() {
        CapabilityError::Timeout(timeout_seconds)
    } else {
        CapabilityError::Unavailable(err.to_string())
    }
}

fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CapabilityError::RateLimited("429".into()).is_retryable());
        assert!(CapabilityError::Unavailable("502".into()).is_retryable());
        assert!(CapabilityError::Timeout(30).is_retryable());
        assert!(!CapabilityError::ContentFiltered("blocked".into()).is_retryable());
        assert!(!CapabilityError::BadInput("empty".into()).is_retryable());
        assert!(!CapabilityError::Malformed("not json".into()).is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let err = classify_http_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, CapabilityError::RateLimited(_)));

        let err = classify_http_status(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, CapabilityError::Unavailable(_)));

        let err = classify_http_status(
            reqwest::StatusCode::BAD_REQUEST,
            "{\"error\": {\"code\": \"content_filter\"}}",
        );
        assert!(matches!(err, CapabilityError::ContentFiltered(_)));

        let err = classify_http_status(reqwest::StatusCode::BAD_REQUEST, "missing field");
        assert!(matches!(err, CapabilityError::BadInput(_)));
    }
}
