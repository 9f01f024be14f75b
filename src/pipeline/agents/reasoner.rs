use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{AggregatedData, AnalysisOutput, VerdictLabel};
use crate::utils::json::{parse_llm_json, parse_llm_value};

const SYSTEM_PROMPT: &str = r#"You are the verdict analyst of a fact-checking pipeline.

Weigh the aggregated evidence and decide a verdict for the claim.
Return a single JSON object:
- "verdict": one of "TRUE", "FALSE", "MIXED", "UNVERIFIED"
- "confidence": 0.0-1.0
- "reasoning": the chain of reasoning
- "evidence": {"supporting": [], "contradicting": [], "neutral": []}
- "red_flags": []

Be conservative: prefer "UNVERIFIED" over overclaiming. Return only JSON."#;

/// 推理分析员 - 基于聚合证据给出结论与置信度
#[derive(Default)]
pub struct Reasoner;

#[async_trait]
impl AgentStep for Reasoner {
    fn stage(&self) -> StageKind {
        StageKind::Reasoning
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let aggregated: AggregatedData = input
            .upstream
            .typed(StageKind::Aggregation)
            .ok_or_else(|| CapabilityError::BadInput("missing aggregation artifact".to_string()))?;

        let facts = aggregated
            .unique_facts
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        let credibility = aggregated
            .credibility_map
            .iter()
            .map(|(url, score)| format!("- {} (credibility {:.2})", url, score))
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            "Claim: {}\n\nAggregated facts:\n{}\n\nSource credibility:\n{}",
            input.claim, facts, credibility
        );
        let response = ctx.llm.generate(SYSTEM_PROMPT, &user_prompt).await?;

        // 结论标签无法识别时兜底为UNVERIFIED，而非让步骤失败
        let mut analysis: AnalysisOutput = match parse_llm_json(&response) {
            Ok(analysis) => analysis,
            Err(_) => {
                let mut value = parse_llm_value(&response)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("verdict".to_string(), Value::String("UNVERIFIED".to_string()));
                }
                serde_json::from_value(value)
                    .map_err(|e| CapabilityError::Malformed(e.to_string()))?
            }
        };
        analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
        if analysis.verdict == VerdictLabel::Unverified && analysis.confidence > 0.5 {
            // UNVERIFIED不应带高置信度
            analysis.confidence = 0.5;
        }

        ctx.log_verbose(&format!(
            "⚖️ 结论 {}，置信度 {:.2}",
            analysis.verdict, analysis.confidence
        ));

        to_payload(&analysis)
    }
}
