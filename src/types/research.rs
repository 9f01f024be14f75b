use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 单条检索结果 - 搜索能力的返回单元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: Option<String>,
    /// 相关性评分，0.0-1.0
    #[serde(default)]
    pub relevance_score: f64,
    /// 可信度评分，0.0-1.0，由来源可信度模型计算
    #[serde(default)]
    pub credibility: f64,
}

/// SOURCE_DISCOVERY阶段的产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFinderOutput {
    /// 实际发出的检索请求
    pub search_queries: Vec<String>,
    /// 按可信度降序排列的信息源
    pub sources: Vec<SearchHit>,
    pub total_found: usize,
}

/// 单个研究问题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub question: String,
    /// 优先级，1-10
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub rationale: String,
}

fn default_priority() -> u8 {
    5
}

/// PLANNING阶段的产出 - 决定并行研究的扇出规模
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningOutput {
    pub research_questions: Vec<ResearchQuestion>,
    #[serde(default)]
    pub identified_gaps: Vec<String>,
}

/// 针对单个来源的研究发现
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub source_url: String,
    pub excerpt: String,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub credibility_score: f64,
}

/// PARALLEL_RESEARCH单个兄弟步骤的产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutput {
    /// 本步骤认领的研究问题（由流水线回填，不信任模型回写）
    #[serde(default)]
    pub question: String,
    pub findings: Vec<ResearchFinding>,
    pub summary: String,
    #[serde(default)]
    pub confidence: f64,
}

/// 事件时间线条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub event: String,
    pub source: String,
}

/// AGGREGATION阶段的产出 - 合并所有研究发现
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedData {
    /// 去重后的事实陈述
    pub unique_facts: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    /// 来源URL -> 可信度
    #[serde(default)]
    pub credibility_map: HashMap<String, f64>,
}
