use async_trait::async_trait;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentStep, StepInput, to_payload};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::StageKind;
use crate::types::{CredibilityBar, TruthMeter, VerdictLabel, VerdictReport, VisualizationSpec};

/// 可视化员 - 把报告转为纯数据形式的图表描述
#[derive(Default)]
pub struct Visualizer;

#[async_trait]
impl AgentStep for Visualizer {
    fn stage(&self) -> StageKind {
        StageKind::Visualization
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

        let truth_meter = TruthMeter {
            value: (report.confidence * 100.0).clamp(0.0, 100.0),
            label: report.verdict.to_string(),
            color: match report.verdict {
                VerdictLabel::True => "green",
                VerdictLabel::False => "red",
                VerdictLabel::Mixed | VerdictLabel::Unverified => "orange",
            }
            .to_string(),
        };

        let mut credibility_bars: Vec<CredibilityBar> = report
            .sources
            .iter()
            .map(|s| CredibilityBar {
                source: s.url.clone(),
                score: s.credibility,
            })
            .collect();
        credibility_bars.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ctx.log_verbose(&format!(
            "📊 可视化：仪表盘 {:.0}，{} 条可信度分布",
            truth_meter.value,
            credibility_bars.len()
        ));

        to_payload(&VisualizationSpec {
            truth_meter,
            timeline_points: report.timeline,
            credibility_bars,
        })
    }
}
