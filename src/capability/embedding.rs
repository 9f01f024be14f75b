//! 向量嵌入能力 - 嵌入计算 + 进程内余弦相似度索引

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::capability::{CapabilityError, classify_http_status, classify_transport_error};
use crate::config::EmbeddingConfig;

/// 最近邻查询命中
#[derive(Debug, Clone)]
pub struct NeighborHit {
    pub id: String,
    pub score: f64,
    pub metadata: Value,
}

/// 向量嵌入与检索能力
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 计算文本的嵌入向量
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;

    /// 写入或覆盖一个向量条目
    async fn upsert(&self, id: &str, vector: Vec<f32>, metadata: Value)
    -> Result<(), CapabilityError>;

    /// 查询top_k个最近邻
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<NeighborHit>, CapabilityError>;
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

struct IndexEntry {
    vector: Vec<f32>,
    metadata: Value,
}

/// 基于reqwest的OpenAI风格嵌入客户端，检索侧为进程内余弦索引
pub struct HttpEmbeddingProvider {
    config: EmbeddingConfig,
    client: reqwest::Client,
    index: Arc<RwLock<HashMap<String, IndexEntry>>>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        Ok(Self {
            config,
            client,
            index: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}

/// 余弦相似度，零向量按0处理
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        if text.trim().is_empty() {
            return Err(CapabilityError::BadInput("empty embedding input".to_string()));
        }

        let url = format!(
            "{}/embeddings",
            self.config.api_base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, &body));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| CapabilityError::Malformed("empty embedding data".to_string()))
    }

    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        metadata: Value,
    ) -> Result<(), CapabilityError> {
        if vector.is_empty() {
            return Err(CapabilityError::BadInput("empty vector".to_string()));
        }
        let mut index = self.index.write().await;
        index.insert(id.to_string(), IndexEntry { vector, metadata });
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
            .map(|(id, entry)| NeighborHit {
                id: id.clone(),
                score: cosine_similarity(vector, &entry.vector),
                metadata: entry.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
