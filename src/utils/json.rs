//! LLM响应中的结构化JSON提取
//!
//! 模型返回的JSON可能被```json围栏包裹，或混杂在说明文字中。
//! 提取顺序：围栏内容 -> 首个'{'到末个'}'的片段 -> 原文。

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capability::CapabilityError;

/// 从LLM响应文本中切出最可能的JSON片段
pub fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + "```json".len()..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }

    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}'))
        && open < close
    {
        return trimmed[open..=close].trim();
    }

    trimmed
}

/// 解析LLM响应为指定的结构化类型
///
/// 解析失败视为模型输出损坏，归类为不可重试错误，由调用方决定兜底策略。
pub fn parse_llm_json<T: DeserializeOwned>(text: &str) -> Result<T, CapabilityError> {
    let block = extract_json_block(text);
    serde_json::from_str::<T>(block)
        .map_err(|e| CapabilityError::Malformed(format!("invalid structured response: {}", e)))
}

/// 宽松解析为JSON Value
pub fn parse_llm_value(text: &str) -> Result<Value, CapabilityError> {
    parse_llm_json::<Value>(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here is the result:\n```json\n{\"a\": 1}\n```\nShort summary: done";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_bare_fence() {
        let text = "```\n{\"a\": 2}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 2}");
    }

    #[test]
    fn test_extract_embedded_object() {
        let text = "The verdict follows. {\"verdict\": \"FALSE\"} That is all.";
        assert_eq!(extract_json_block(text), "{\"verdict\": \"FALSE\"}");
    }

    #[test]
    fn test_parse_failure_is_malformed() {
        let err = parse_llm_json::<serde_json::Value>("no json here").unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed(_)));
        assert!(!err.is_retryable());
    }
}
