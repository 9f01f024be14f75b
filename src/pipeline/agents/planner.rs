use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{PlanningOutput, ResearchQuestion, SourceFinderOutput, StructuredClaim};
use crate::utils::json::parse_llm_json;

const SYSTEM_PROMPT: &str = r#"You are a research planner for a fact-checking pipeline.

Given a structured claim and the discovered sources, produce the research questions
whose answers would settle the claim. Return a single JSON object:
- "research_questions": [{"question": "...", "priority": 1-10, "rationale": "..."}]
- "identified_gaps": ["..."]

Order questions by priority descending. Return only JSON."#;

/// 研究规划员 - 产出研究问题清单，决定并行研究的扇出规模
#[derive(Default)]
pub struct Planner;

#[async_trait]
impl AgentStep for Planner {
    fn stage(&self) -> StageKind {
        StageKind::Planning
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let structured: StructuredClaim = input
            .upstream
            .typed(StageKind::QueryAnalysis)
            .ok_or_else(|| {
                CapabilityError::BadInput("missing query analysis artifact".to_string())
            })?;
        let discovery: SourceFinderOutput = input
            .upstream
            .typed(StageKind::SourceDiscovery)
            .ok_or_else(|| {
                CapabilityError::BadInput("missing source discovery artifact".to_string())
            })?;

        let source_digest = discovery
            .sources
            .iter()
            .take(10)
            .map(|s| format!("- {} ({})", s.title, s.url))
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            "Claim: {}\nClaim type: {:?}\n\nDiscovered sources:\n{}",
            structured.original_claim, structured.claim_type, source_digest
        );

        let response = ctx.llm.generate(SYSTEM_PROMPT, &user_prompt).await?;
        let mut plan: PlanningOutput = parse_llm_json(&response)?;

        // 空计划兜底为单问题，保证扇出至少为1
        if plan.research_questions.is_empty() {
            plan.research_questions.push(ResearchQuestion {
                question: format!("Is the claim \"{}\" accurate?", structured.original_claim),
                priority: 5,
                rationale: "fallback question for empty plan".to_string(),
            });
        }
        plan.research_questions
            .sort_by(|a, b| b.priority.cmp(&a.priority));
        plan.research_questions
            .truncate(ctx.config.pipeline.max_research_fanout);

        ctx.log_verbose(&format!(
            "🧭 规划 {} 个研究问题",
            plan.research_questions.len()
        ));

        to_payload(&plan)
    }
}
