use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{PlanningOutput, ResearchOutput, SourceFinderOutput};
use crate::utils::json::parse_llm_json;

const SYSTEM_PROMPT: &str = r#"You are a research assistant investigating one question for a fact-check.

Given the question and the snippets of candidate sources, extract the findings that
bear on the question. Return a single JSON object:
- "summary": concise answer grounded in the sources
- "confidence": 0.0-1.0
- "findings": [{"source_url": "...", "excerpt": "...", "relevance": 0.0-1.0, "credibility_score": 0.0-1.0}]

Only cite the provided sources. Return only JSON."#;

/// 并行研究员 - 扇出兄弟之一，负责单个研究问题
#[derive(Default)]
pub struct Researcher;

#[async_trait]
impl AgentStep for Researcher {
    fn stage(&self) -> StageKind {
        StageKind::ParallelResearch
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let plan: PlanningOutput = input.upstream.typed(StageKind::Planning).ok_or_else(|| {
            CapabilityError::BadInput("missing planning artifact".to_string())
        })?;
        let discovery: SourceFinderOutput = input
            .upstream
            .typed(StageKind::SourceDiscovery)
            .ok_or_else(|| {
                CapabilityError::BadInput("missing source discovery artifact".to_string())
            })?;

        // 按扇出下标认领研究问题
        let question = plan
            .research_questions
            .get(input.fanout_index)
            .map(|q| q.question.clone())
            .unwrap_or_else(|| format!("Is the claim \"{}\" accurate?", input.claim));

        let source_digest = discovery
            .sources
            .iter()
            .take(5)
            .map(|s| {
                format!(
                    "- {} ({})\n  {}",
                    s.title,
                    s.url,
                    s.snippet.as_deref().unwrap_or("(no snippet)")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!("Question: {}\n\nSources:\n{}", question, source_digest);
        let response = ctx.llm.generate(SYSTEM_PROMPT, &user_prompt).await?;

        let mut output: ResearchOutput = parse_llm_json(&response)?;
        output.question = question;
        // 用域名声誉模型校准模型给出的可信度
        for finding in &mut output.findings {
            let domain_score = crate::utils::credibility::score_source(&finding.source_url);
            finding.credibility_score = (finding.credibility_score + domain_score) / 2.0;
        }

        ctx.log_verbose(&format!(
            "🔬 研究问题[{}]获得 {} 条发现",
            input.fanout_index,
            output.findings.len()
        ));

        to_payload(&output)
    }
}
