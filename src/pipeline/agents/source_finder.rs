use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{SearchHit, SourceFinderOutput, StructuredClaim};

/// 信息源发现员 - 依据结构化断言检索候选来源
#[derive(Default)]
pub struct SourceFinder;

#[async_trait]
impl AgentStep for SourceFinder {
    fn stage(&self) -> StageKind {
        StageKind::SourceDiscovery
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

        // 原始断言整句 + 实体组合，最多三条检索
        let mut queries = vec![structured.original_claim.clone()];
        let terms = structured.search_terms();
        if terms.len() > 1 {
            queries.push(terms.join(" "));
        }
        queries.push(format!("{} fact check", structured.original_claim));
        queries.truncate(3);

        let results =
            futures::future::join_all(queries.iter().map(|query| ctx.search.search(query))).await;

        let mut sources: Vec<SearchHit> = Vec::new();
        let mut last_err = None;
        for result in results {
            match result {
                Ok(hits) => sources.extend(hits),
                // 单条检索失败不致命，全部失败才上抛
                Err(e) => last_err = Some(e),
            }
        }
        if sources.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        // URL去重，低相关结果过滤，按可信度降序
        let min_relevance = ctx.config.search.min_relevance;
        sources.sort_by(|a, b| {
            b.credibility
                .partial_cmp(&a.credibility)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut seen = std::collections::HashSet::new();
        sources.retain(|hit| {
            hit.relevance_score >= min_relevance && seen.insert(hit.url.clone())
        });
        sources.truncate(ctx.config.search.max_results);

        let output = SourceFinderOutput {
            search_queries: queries,
            total_found: sources.len(),
            sources,
        };
        ctx.log_verbose(&format!("🔎 发现 {} 个候选来源", output.total_found));

        to_payload(&output)
    }
}
