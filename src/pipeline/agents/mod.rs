//! 智能体步骤 - 九个阶段在统一执行契约下的各自实现
//!
//! 每个阶段只消费上游产物、调用外部能力、产出自己的类型化payload；
//! 执行与完成协议完全一致，互不触碰对方的产物。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capability::CapabilityError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::{StageKind, StepId};
use crate::store::Artifact;

mod aggregator;
mod chat_indexer;
mod planner;
mod query_analyzer;
mod reasoner;
mod reporter;
mod researcher;
mod source_finder;
mod visualizer;

pub use aggregator::Aggregator;
pub use chat_indexer::ChatIndexer;
pub use planner::Planner;
pub use query_analyzer::QueryAnalyzer;
pub use reasoner::Reasoner;
pub use reporter::Reporter;
pub use researcher::Researcher;
pub use source_finder::SourceFinder;
pub use visualizer::Visualizer;

/// 上游产物集合，按阶段分组
#[derive(Debug, Clone, Default)]
pub struct UpstreamArtifacts {
    by_stage: HashMap<StageKind, Vec<Artifact>>,
}

impl UpstreamArtifacts {
    pub fn from_artifacts(artifacts: Vec<Artifact>, stage_of: impl Fn(&str) -> Option<StageKind>) -> Self {
        let mut by_stage: HashMap<StageKind, Vec<Artifact>> = HashMap::new();
        for artifact in artifacts {
            if let Some(stage) = stage_of(&artifact.step_id) {
                by_stage.entry(stage).or_default().push(artifact);
            }
        }
        // 扇出兄弟按步骤ID稳定排序
        for group in by_stage.values_mut() {
            group.sort_by(|a, b| a.step_id.cmp(&b.step_id));
        }
        Self { by_stage }
    }

    /// 某阶段的首个产物，反序列化为具体类型
    pub fn typed<T: DeserializeOwned>(&self, stage: StageKind) -> Option<T> {
        self.by_stage
            .get(&stage)
            .and_then(|group| group.first())
            .and_then(|a| a.typed())
    }

    /// 某阶段的全部产物（扇出阶段有多个）
    pub fn typed_all<T: DeserializeOwned>(&self, stage: StageKind) -> Vec<T> {
        self.by_stage
            .get(&stage)
            .map(|group| group.iter().filter_map(|a| a.typed()).collect())
            .unwrap_or_default()
    }

    pub fn has(&self, stage: StageKind) -> bool {
        self.by_stage.get(&stage).is_some_and(|g| !g.is_empty())
    }
}

/// 单次步骤执行的输入
#[derive(Debug, Clone)]
pub struct StepInput {
    pub run_id: String,
    /// 原始断言文本
    pub claim: String,
    pub step_id: StepId,
    /// 扇出兄弟的发现顺序下标
    pub fanout_index: usize,
    pub upstream: UpstreamArtifacts,
}

/// 统一的智能体步骤契约
#[async_trait]
pub trait AgentStep: Send + Sync {
    /// 所属阶段
    fn stage(&self) -> StageKind;

    /// 执行并返回类型化payload（JSON形式），失败返回能力错误
    async fn execute(
        &self,
        ctx: &PipelineContext,
        input: &StepInput,
    ) -> Result<Value, CapabilityError>;
}

/// 阶段种类 -> 智能体实现的注册表
#[derive(Clone)]
pub struct AgentRegistry {
    agents: HashMap<StageKind, Arc<dyn AgentStep>>,
}

impl AgentRegistry {
    /// 标准九阶段注册表
    pub fn standard() -> Self {
        let agents: Vec<Arc<dyn AgentStep>> = vec![
            Arc::new(QueryAnalyzer),
            Arc::new(SourceFinder),
            Arc::new(Planner),
            Arc::new(Researcher),
            Arc::new(Aggregator),
            Arc::new(Reasoner),
            Arc::new(Reporter),
            Arc::new(Visualizer),
            Arc::new(ChatIndexer),
        ];
        Self {
            agents: agents.into_iter().map(|a| (a.stage(), a)).collect(),
        }
    }

    pub fn get(&self, stage: StageKind) -> Option<Arc<dyn AgentStep>> {
        self.agents.get(&stage).cloned()
    }
}

/// 序列化payload，序列化失败归类为输出损坏
pub(crate) fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, CapabilityError> {
    serde_json::to_value(value).map_err(|e| CapabilityError::Malformed(e.to_string()))
}
