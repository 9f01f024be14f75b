use async_trait::async_trait;
use serde_json::{Value, json};

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{ChatIndexOutput, VerdictReport};

/// 对话索引员 - 把报告切成段落写入向量索引，供后续问答检索
#[derive(Default)]
pub struct ChatIndexer;

/// 报告的可索引段落，(段落名, 文本)
fn report_sections(report: &VerdictReport) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    sections.push((
        "verdict".to_string(),
        format!(
            "Claim: {}\nVerdict: {} (confidence {:.0}%)",
            report.claim,
            report.verdict,
            report.confidence * 100.0
        ),
    ));
    if !report.executive_summary.trim().is_empty() {
        sections.push(("summary".to_string(), report.executive_summary.clone()));
    }
    for (i, finding) in report.key_findings.iter().enumerate() {
        sections.push((format!("finding_{}", i), finding.clone()));
    }
    for (i, event) in report.timeline.iter().enumerate() {
        sections.push((
            format!("timeline_{}", i),
            format!("{} ({})", event.event, event.source),
        ));
    }
    sections
}

#[async_trait]
impl AgentStep for ChatIndexer {
    fn stage(&self) -> StageKind {
        StageKind::ChatIndexing
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let report: VerdictReport = input
            .upstream
            .typed(StageKind::Reporting)
            .ok_or_else(|| CapabilityError::BadInput("missing report artifact".to_string()))?;

        let mut indexed_sections = Vec::new();
        let mut vector_ids = Vec::new();

        for (section, text) in report_sections(&report) {
            let vector = ctx.embedding.embed(&text).await?;
            let id = format!("{}:{}", input.run_id, section);
            ctx.embedding
                .upsert(
                    &id,
                    vector,
                    json!({
                        "run_id": input.run_id,
                        "section": section,
                        "text": text,
                    }),
                )
                .await?;
            indexed_sections.push(section);
            vector_ids.push(id);
        }

        ctx.log_verbose(&format!("🗂️ 报告已入索引，{} 个段落", vector_ids.len()));

        to_payload(&ChatIndexOutput {
            indexed_sections,
            vector_ids,
        })
    }
}
