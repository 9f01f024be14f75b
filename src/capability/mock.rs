//! Mock能力实现（用于测试与离线试运行，无需API）
//!
//! 支持脚本化响应、故障注入与并发峰值观测。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::capability::embedding::cosine_similarity;
use crate::capability::{CapabilityError, EmbeddingProvider, LlmProvider, NeighborHit, SearchProvider};
use crate::types::SearchHit;

/// 注入故障的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailureKind {
    RateLimited,
    Unavailable,
    Timeout,
    ContentFiltered,
    BadInput,
}

impl MockFailureKind {
    fn to_error(self) -> CapabilityError {
        match self {
            MockFailureKind::RateLimited => CapabilityError::RateLimited("mock".to_string()),
            MockFailureKind::Unavailable => CapabilityError::Unavailable("mock".to_string()),
            MockFailureKind::Timeout => CapabilityError::Timeout(0),
            MockFailureKind::ContentFiltered => {
                CapabilityError::ContentFiltered("mock".to_string())
            }
            MockFailureKind::BadInput => CapabilityError::BadInput("mock".to_string()),
        }
    }
}

/// 并发观测器 - 记录同时在途的调用峰值
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// 观测到的最大并发度
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub type LlmResponder = dyn Fn(&str, &str) -> Result<String, CapabilityError> + Send + Sync;

/// Mock LLM客户端
pub struct MockLlm {
    responder: Arc<LlmResponder>,
    fail_remaining: AtomicUsize,
    fail_kind: MockFailureKind,
    delay: Duration,
    pub gauge: Arc<ConcurrencyGauge>,
}

impl MockLlm {
    pub fn new(responder: Arc<LlmResponder>) -> Self {
        Self {
            responder,
            fail_remaining: AtomicUsize::new(0),
            fail_kind: MockFailureKind::Unavailable,
            delay: Duration::from_millis(0),
            gauge: Arc::new(ConcurrencyGauge::default()),
        }
    }

    /// 按系统提示词中的阶段标记返回合理的固定响应
    pub fn canned() -> Self {
        Self::new(Arc::new(|system: &str, user: &str| {
            Ok(canned_response(system, user))
        }))
    }

    /// 前n次调用注入指定故障
    pub fn with_failures(mut self, n: usize, kind: MockFailureKind) -> Self {
        self.fail_remaining = AtomicUsize::new(n);
        self.fail_kind = kind;
        self
    }

    /// 每次调用附加固定延迟（用于并发观测）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CapabilityError> {
        self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(self.fail_kind.to_error())
        } else {
            (self.responder)(system_prompt, user_prompt)
        };
        self.gauge.exit();
        result
    }
}

/// 依据阶段标记生成固定响应
fn canned_response(system_prompt: &str, user_prompt: &str) -> String {
    if system_prompt.contains("claim analyst") {
        let claim = user_prompt
            .lines()
            .find(|l| l.starts_with("Claim:"))
            .map(|l| l.trim_start_matches("Claim:").trim())
            .unwrap_or("unknown claim");
        return format!(
            r#"{{"original_claim": "{}", "entities": {{"actors": ["subject"], "actions": ["claims"], "objects": ["object"], "temporal": [], "geographic": []}}, "claim_type": "factual_claim", "urgency": "medium"}}"#,
            claim.replace('"', "'")
        );
    }
    if system_prompt.contains("research planner") {
        return r#"{"research_questions": [
            {"question": "What do primary sources say?", "priority": 9, "rationale": "primary evidence"},
            {"question": "What do fact-checkers conclude?", "priority": 8, "rationale": "existing verdicts"},
            {"question": "Is there contradicting coverage?", "priority": 6, "rationale": "balance"}
        ], "identified_gaps": []}"#
            .to_string();
    }
    if system_prompt.contains("research assistant") {
        return r#"{"summary": "Sources consistently refute the claim.", "confidence": 0.9, "findings": [
            {"source_url": "https://example.org/a", "excerpt": "Direct measurements contradict the claim.", "relevance": 0.9, "credibility_score": 0.8}
        ]}"#
        .to_string();
    }
    if system_prompt.contains("verdict") {
        return r#"{"verdict": "FALSE", "confidence": 0.97, "reasoning": "All credible sources contradict the claim.", "evidence": {"supporting": [], "contradicting": ["Direct measurements contradict the claim."], "neutral": []}, "red_flags": []}"#.to_string();
    }
    "{}".to_string()
}

/// Mock搜索客户端
pub struct MockSearch {
    hits: Vec<SearchHit>,
    fail_always: Option<MockFailureKind>,
}

impl MockSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            fail_always: None,
        }
    }

    /// 三条固定的高可信来源
    pub fn canned() -> Self {
        let hits = vec![
            ("https://www.nasa.gov/moon-composition", "Lunar composition data"),
            ("https://www.nature.com/articles/moon-rock", "Analysis of Apollo samples"),
            ("https://apnews.com/article/moon-facts", "Fact check: lunar claims"),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (url, title))| SearchHit {
            url: url.to_string(),
            title: title.to_string(),
            snippet: Some(format!("Snippet for {}", title)),
            relevance_score: 1.0 - i as f64 * 0.1,
            credibility: crate::utils::credibility::score_source(url),
        })
        .collect();
        Self::with_hits(hits)
    }

    /// 每次调用都注入指定故障
    pub fn failing(kind: MockFailureKind) -> Self {
        Self {
            hits: Vec::new(),
            fail_always: Some(kind),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        if let Some(kind) = self.fail_always {
            return Err(kind.to_error());
        }
        Ok(self.hits.clone())
    }
}

/// Mock嵌入客户端 - 文本字节的确定性伪向量 + 进程内索引
#[derive(Default)]
pub struct MockEmbedding {
    index: RwLock<HashMap<String, (Vec<f32>, Value)>>,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入索引的条目数
    pub async fn indexed_count(&self) -> usize {
        self.index.read().await.len()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        if text.trim().is_empty() {
            return Err(CapabilityError::BadInput("empty embedding input".to_string()));
        }
        // 8维确定性伪向量，内容不同则方向不同
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += byte as f32 / 255.0;
        }
        Ok(vector)
    }

    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Value,
    ) -> Result<(), CapabilityError> {
        self.index
            .write()
            .await
            .insert(id.to_string(), (vector, metadata));
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<NeighborHit>, CapabilityError> {
        let index = self.index.read().await;
        let mut hits: Vec<NeighborHit> = index
            .iter()
            .map(|(id, (v, metadata))| NeighborHit {
                id: id.clone(),
                score: cosine_similarity(vector, v),
                metadata: metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}
