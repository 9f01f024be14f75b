use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{
    AggregatedData, AnalysisOutput, SourceFinderOutput, SourceRef, StructuredClaim, VerdictLabel,
    VerdictReport,
};

/// 报告员 - 容错的终态汇编步骤
///
/// 不调用LLM：消费运行目录下实际存在的全部上游产物，缺什么就
/// 降级什么，把缺失阶段如实写进incomplete_stages。上游全部失败
/// 时仍产出UNVERIFIED报告，而不是让运行空手而归。
#[derive(Default)]
pub struct Reporter;

/// 报告汇编必需的上游阶段（扇出研究通过聚合间接参与）
const UPSTREAM_STAGES: [StageKind; 6] = [
    StageKind::QueryAnalysis,
    StageKind::SourceDiscovery,
    StageKind::Planning,
    StageKind::ParallelResearch,
    StageKind::Aggregation,
    StageKind::Reasoning,
];

#[async_trait]
impl AgentStep for Reporter {
    fn stage(&self) -> StageKind {
        StageKind::Reporting
    }

    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError> {
        let structured: Option<StructuredClaim> = input.upstream.typed(StageKind::QueryAnalysis);
        let discovery: Option<SourceFinderOutput> =
            input.upstream.typed(StageKind::SourceDiscovery);
        let aggregated: Option<AggregatedData> = input.upstream.typed(StageKind::Aggregation);
        let analysis: Option<AnalysisOutput> = input.upstream.typed(StageKind::Reasoning);

        let incomplete_stages: Vec<String> = UPSTREAM_STAGES
            .iter()
            .filter(|stage| !input.upstream.has(**stage))
            .map(|stage| stage.as_str().to_string())
            .collect();

        let claim = structured
            .as_ref()
            .map(|s| s.original_claim.clone())
            .unwrap_or_else(|| input.claim.clone());

        let (verdict, confidence, mut evidence, reasoning) = match &analysis {
            Some(a) => (a.verdict, a.confidence, a.evidence.clone(), a.reasoning.clone()),
            // 推理缺失时报告降级为UNVERIFIED，置信度归零
            None => (VerdictLabel::Unverified, 0.0, Default::default(), String::new()),
        };

        let key_findings = aggregated
            .as_ref()
            .map(|agg| agg.unique_facts.clone())
            .unwrap_or_default();
        if analysis.is_none() {
            // 无结论时所有事实归入中立组
            evidence.neutral = key_findings.clone();
        }

        let timeline = aggregated
            .as_ref()
            .map(|agg| agg.timeline.clone())
            .unwrap_or_default();
        let sources: Vec<SourceRef> = discovery
            .as_ref()
            .map(|d| d.sources.iter().map(SourceRef::from).collect())
            .unwrap_or_default();

        let executive_summary = if reasoning.trim().is_empty() {
            format!(
                "Verdict: {} (confidence {:.0}%). Based on {} fact(s) from {} source(s).",
                verdict,
                confidence * 100.0,
                key_findings.len(),
                sources.len()
            )
        } else {
            reasoning
        };

        let report = VerdictReport {
            title: format!("Fact-check: {}", claim),
            claim,
            verdict,
            confidence,
            executive_summary,
            key_findings,
            evidence,
            timeline,
            sources,
            incomplete_stages,
            generated_at: Utc::now(),
        };

        self.write_markdown(ctx, input, &report).await?;

        ctx.log_verbose(&format!(
            "📋 报告生成，结论 {}{}",
            report.verdict,
            if report.is_degraded() { "（降级）" } else { "" }
        ));

        to_payload(&report)
    }
}

impl Reporter {
    /// 把报告渲染为Markdown写入输出目录
    async fn write_markdown(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
        report: &VerdictReport,
    ) -> Result<(), CapabilityError> {
        let dir = &ctx.config.output_path;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        let path = dir.join(format!("{}.md", input.run_id));
        tokio::fs::write(&path, render_markdown(report))
            .await
            .map_err(|e| CapabilityError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

fn render_markdown(report: &VerdictReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&format!(
        "**Verdict: {}** (confidence {:.0}%)\n\n",
        report.verdict,
        report.confidence * 100.0
    ));
    out.push_str(&format!("{}\n\n", report.executive_summary));

    if !report.key_findings.is_empty() {
        out.push_str("## Key findings\n\n");
        for finding in &report.key_findings {
            out.push_str(&format!("- {}\n", finding));
        }
        out.push('\n');
    }

    if !report.evidence.supporting.is_empty() || !report.evidence.contradicting.is_empty() {
        out.push_str("## Evidence\n\n");
        for item in &report.evidence.supporting {
            out.push_str(&format!("- ✅ {}\n", item));
        }
        for item in &report.evidence.contradicting {
            out.push_str(&format!("- ❌ {}\n", item));
        }
        for item in &report.evidence.neutral {
            out.push_str(&format!("- ⚪ {}\n", item));
        }
        out.push('\n');
    }

    if !report.sources.is_empty() {
        out.push_str("## Sources\n\n");
        for source in &report.sources {
            out.push_str(&format!(
                "- [{}]({}) (credibility {:.2})\n",
                source.title, source.url, source.credibility
            ));
        }
        out.push('\n');
    }

    if report.is_degraded() {
        out.push_str("## Caveats\n\n");
        out.push_str(&format!(
            "Incomplete stages: {}\n",
            report.incomplete_stages.join(", ")
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceGroups;

    fn sample_report(incomplete: Vec<String>) -> VerdictReport {
        VerdictReport {
            title: "Fact-check: the moon is made of cheese".to_string(),
            claim: "the moon is made of cheese".to_string(),
            verdict: VerdictLabel::False,
            confidence: 0.97,
            executive_summary: "Lunar samples are basalt.".to_string(),
            key_findings: vec!["Apollo samples are volcanic rock".to_string()],
            evidence: EvidenceGroups {
                supporting: vec![],
                contradicting: vec!["Sample analysis".to_string()],
                neutral: vec![],
            },
            timeline: vec![],
            sources: vec![],
            incomplete_stages: incomplete,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn markdown_contains_verdict_and_findings() {
        let md = render_markdown(&sample_report(vec![]));
        assert!(md.contains("**Verdict: FALSE**"));
        assert!(md.contains("Apollo samples are volcanic rock"));
        assert!(!md.contains("Caveats"));
    }

    #[test]
    fn degraded_report_lists_incomplete_stages() {
        let md = render_markdown(&sample_report(vec!["REASONING".to_string()]));
        assert!(md.contains("## Caveats"));
        assert!(md.contains("REASONING"));
    }
}
