//! 搜索能力 - Serp风格的网页检索接口

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::{CapabilityError, classify_http_status, classify_transport_error};
use crate::config::SearchConfig;
use crate::types::SearchHit;
use crate::utils::credibility;

/// 网页检索能力
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// 检索并返回按相关性排列的结果
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError>;
}

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<SerpResult>,
}

#[derive(Deserialize)]
struct SerpResult {
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: Option<String>,
}

/// 基于reqwest的Serp风格搜索客户端
pub struct HttpSearchProvider {
    config: SearchConfig,
    client: reqwest::Client,
}

impl HttpSearchProvider {
    pub fn new(config: SearchConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CapabilityError> {
        if query.trim().is_empty() {
            return Err(CapabilityError::BadInput("empty search query".to_string()));
        }

        let url = format!("{}/search", self.config.api_base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query),
                ("api_key", self.config.api_key.as_str()),
                ("num", &self.config.max_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, &body));
        }

        let parsed: SerpResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        // 按返回顺序赋相关性，头部结果更相关；可信度走域名声誉模型
        let total = parsed.organic_results.len().max(1);
        let hits = parsed
            .organic_results
            .into_iter()
            .take(self.config.max_results)
            .enumerate()
            .map(|(i, r)| SearchHit {
                relevance_score: 1.0 - (i as f64 / total as f64) * 0.5,
                credibility: credibility::score_source(&r.link),
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect();

        Ok(hits)
    }
}
