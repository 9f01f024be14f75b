use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{AggregatedData, ResearchOutput, TimelineEvent};

/// 数据聚合员 - 合并全部扇出兄弟的研究发现
///
/// 纯数据变换，不调用外部能力。
#[derive(Default)]
pub struct Aggregator;

#[async_trait]
impl AgentStep for Aggregator {
    fn stage(&self) -> StageKind {
        StageKind::Aggregation
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let outputs: Vec<ResearchOutput> = input.upstream.typed_all(StageKind::ParallelResearch);
        if outputs.is_empty() {
            return Err(CapabilityError::BadInput(
                "no research outputs to aggregate".to_string(),
            ));
        }

        let mut unique_facts: Vec<String> = Vec::new();
        let mut credibility_map: HashMap<String, f64> = HashMap::new();
        let mut timeline: Vec<TimelineEvent> = Vec::new();

        for output in &outputs {
            if !output.summary.trim().is_empty()
                && !unique_facts.contains(&output.summary)
            {
                unique_facts.push(output.summary.clone());
            }
            for finding in &output.findings {
                if !finding.excerpt.trim().is_empty()
                    && !unique_facts.contains(&finding.excerpt)
                {
                    unique_facts.push(finding.excerpt.clone());
                }
                // 同一来源取可信度最大值
                let entry = credibility_map
                    .entry(finding.source_url.clone())
                    .or_insert(0.0);
                if finding.credibility_score > *entry {
                    *entry = finding.credibility_score;
                }
                timeline.push(TimelineEvent {
                    date: String::new(),
                    event: finding.excerpt.clone(),
                    source: finding.source_url.clone(),
                });
            }
        }

        ctx.log_verbose(&format!(
            "🧮 聚合 {} 个研究产出，{} 条去重事实",
            outputs.len(),
            unique_facts.len()
        ));

        to_payload(&AggregatedData {
            unique_facts,
            timeline,
            credibility_map,
        })
    }
}
