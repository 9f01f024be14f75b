use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::research::{SearchHit, TimelineEvent};

/// 核查结论标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictLabel {
    True,
    False,
    Mixed,
    #[default]
    Unverified,
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictLabel::True => write!(f, "TRUE"),
            VerdictLabel::False => write!(f, "FALSE"),
            VerdictLabel::Mixed => write!(f, "MIXED"),
            VerdictLabel::Unverified => write!(f, "UNVERIFIED"),
        }
    }
}

impl std::str::FromStr for VerdictLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRUE" => Ok(VerdictLabel::True),
            "FALSE" => Ok(VerdictLabel::False),
            "MIXED" => Ok(VerdictLabel::Mixed),
            "UNVERIFIED" => Ok(VerdictLabel::Unverified),
            other => Err(format!("Unknown verdict label: {}", other)),
        }
    }
}

/// 证据分组 - 支持/反驳/中立
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceGroups {
    #[serde(default)]
    pub supporting: Vec<String>,
    #[serde(default)]
    pub contradicting: Vec<String>,
    #[serde(default)]
    pub neutral: Vec<String>,
}

/// REASONING阶段的产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    #[serde(default)]
    pub verdict: VerdictLabel,
    /// 置信度，0.0-1.0
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub evidence: EvidenceGroups,
    /// 信息环境中的风险信号
    #[serde(default)]
    pub red_flags: Vec<String>,
}

/// 报告中的来源条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
    pub credibility: f64,
}

impl From<&SearchHit> for SourceRef {
    fn from(hit: &SearchHit) -> Self {
        Self {
            url: hit.url.clone(),
            title: hit.title.clone(),
            credibility: hit.credibility,
        }
    }
}

/// REPORTING阶段的终态产出 - 面向用户的核查报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictReport {
    pub title: String,
    pub claim: String,
    pub verdict: VerdictLabel,
    pub confidence: f64,
    pub executive_summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub evidence: EvidenceGroups,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// 未能完成的阶段（降级报告时非空）
    #[serde(default)]
    pub incomplete_stages: Vec<String>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl VerdictReport {
    /// 是否为降级（部分阶段缺失）报告
    pub fn is_degraded(&self) -> bool {
        !self.incomplete_stages.is_empty()
    }
}

/// 真相仪表盘刻度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthMeter {
    /// 0-100
    pub value: f64,
    pub label: String,
    /// green / red / orange
    pub color: String,
}

/// 可信度分布条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredibilityBar {
    pub source: String,
    pub score: f64,
}

/// VISUALIZATION阶段的产出 - 纯数据形式的图表描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationSpec {
    pub truth_meter: TruthMeter,
    #[serde(default)]
    pub timeline_points: Vec<TimelineEvent>,
    #[serde(default)]
    pub credibility_bars: Vec<CredibilityBar>,
}

/// CHAT_INDEXING阶段的产出 - 报告内容已入向量索引的摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatIndexOutput {
    pub indexed_sections: Vec<String>,
    pub vector_ids: Vec<String>,
}
