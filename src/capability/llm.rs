//! LLM能力 - OpenAI兼容的chat completions接口

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityError, classify_http_status, classify_transport_error};
use crate::config::LLMConfig;

/// LLM生成能力
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 单轮生成：系统提示词 + 用户提示词 -> 文本
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CapabilityError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// 基于reqwest的OpenAI兼容LLM客户端
pub struct HttpLlmProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl HttpLlmProvider {
    pub fn new(config: LLMConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CapabilityError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_status(status, &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::Malformed("empty choices".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(CapabilityError::ContentFiltered(
                "generation stopped by provider content filter".to_string(),
            ));
        }

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CapabilityError::Malformed("empty completion content".to_string()))
    }
}
