use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::StructuredClaim;
use crate::utils::json::parse_llm_json;

const SYSTEM_PROMPT: &str = r#"You are a claim analyst for a fact-checking pipeline.

Decompose the user's claim into structured entities and classify it.
Return a single JSON object with fields:
- "original_claim": the claim verbatim
- "entities": {"actors": [], "actions": [], "objects": [], "temporal": [], "geographic": []}
- "claim_type": one of "policy_announcement", "factual_claim", "prediction", "opinion", "mixed"
- "urgency": one of "low", "medium", "high"

Return only JSON, no commentary."#;

/// 查询分析员 - 将原始断言解析为结构化断言
#[derive(Default)]
pub struct QueryAnalyzer;

#[async_trait]
impl AgentStep for QueryAnalyzer {
    fn stage(&self) -> StageKind {
        StageKind::QueryAnalysis
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        if input.claim.trim().is_empty() {
            return Err(CapabilityError::BadInput("empty claim text".to_string()));
        }

        let user_prompt = format!("Claim: {}", input.claim.trim());
        let response = ctx.llm.generate(SYSTEM_PROMPT, &user_prompt).await?;

        let mut claim: StructuredClaim = parse_llm_json(&response)?;
        // 原始断言以用户输入为准，不信任模型回写
        claim.original_claim = input.claim.trim().to_string();

        to_payload(&claim)
    }
}
