use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 断言类型 - 由查询分析阶段判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    PolicyAnnouncement,
    #[default]
    FactualClaim,
    Prediction,
    Opinion,
    Mixed,
}

/// 核查紧急程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// 从断言文本中抽取的实体要素
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    /// 涉及的主体（谁）
    #[serde(default)]
    pub actors: Vec<String>,
    /// 发生的行为（做了什么）
    #[serde(default)]
    pub actions: Vec<String>,
    /// 行为的对象
    #[serde(default)]
    pub objects: Vec<String>,
    /// 时间要素
    #[serde(default)]
    pub temporal: Vec<String>,
    /// 地理要素
    #[serde(default)]
    pub geographic: Vec<String>,
}

/// 结构化断言 - QUERY_ANALYSIS阶段的产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredClaim {
    /// 用户输入的原始断言
    pub original_claim: String,
    pub entities: Entities,
    #[serde(default)]
    pub claim_type: ClaimType,
    #[serde(default)]
    pub urgency: UrgencyLevel,
    #[serde(default = "Utc::now")]
    pub extracted_at: DateTime<Utc>,
}

impl StructuredClaim {
    /// 构建检索关键词，实体优先，兜底使用原始断言
    pub fn search_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for group in [
            &self.entities.actors,
            &self.entities.actions,
            &self.entities.objects,
        ] {
            for item in group.iter() {
                if !item.trim().is_empty() {
                    terms.push(item.trim().to_string());
                }
            }
        }
        if terms.is_empty() {
            terms.push(self.original_claim.clone());
        }
        terms
    }
}
