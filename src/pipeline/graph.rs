//! 任务图 - 九阶段研究流水线的有向无环图表示
//!
//! 静态九阶段拓扑在构建时固定；PARALLEL_RESEARCH在规划产出后
//! 动态扩展为多个兄弟步骤（扇出），扩展后重新校验无环性质。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 图构建与变更错误
#[derive(Debug, Error)]
pub enum GraphError {
    /// 图中存在环 - 致命，运行在启动前中止
    #[error("task graph contains a cycle involving step {0}")]
    Cycle(String),

    #[error("duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("unknown dependency {dep} declared by step {step}")]
    UnknownDependency { step: String, dep: String },

    #[error("unknown step id: {0}")]
    UnknownStep(String),
}

/// 流水线阶段种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageKind {
    QueryAnalysis,
    SourceDiscovery,
    Planning,
    ParallelResearch,
    Aggregation,
    Reasoning,
    Reporting,
    Visualization,
    ChatIndexing,
}

impl StageKind {
    /// 固定的阶段声明顺序，用于确定性调度
    pub const ALL: [StageKind; 9] = [
        StageKind::QueryAnalysis,
        StageKind::SourceDiscovery,
        StageKind::Planning,
        StageKind::ParallelResearch,
        StageKind::Aggregation,
        StageKind::Reasoning,
        StageKind::Reporting,
        StageKind::Visualization,
        StageKind::ChatIndexing,
    ];

    /// 阶段在声明顺序中的下标
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::QueryAnalysis => "QUERY_ANALYSIS",
            StageKind::SourceDiscovery => "SOURCE_DISCOVERY",
            StageKind::Planning => "PLANNING",
            StageKind::ParallelResearch => "PARALLEL_RESEARCH",
            StageKind::Aggregation => "AGGREGATION",
            StageKind::Reasoning => "REASONING",
            StageKind::Reporting => "REPORTING",
            StageKind::Visualization => "VISUALIZATION",
            StageKind::ChatIndexing => "CHAT_INDEXING",
        }
    }

    /// 该阶段基础步骤ID（扇出兄弟在其后追加下标）
    pub fn base_step_id(&self) -> &'static str {
        match self {
            StageKind::QueryAnalysis => "query_analysis",
            StageKind::SourceDiscovery => "source_discovery",
            StageKind::Planning => "planning",
            StageKind::ParallelResearch => "parallel_research_0",
            StageKind::Aggregation => "aggregation",
            StageKind::Reasoning => "reasoning",
            StageKind::Reporting => "reporting",
            StageKind::Visualization => "visualization",
            StageKind::ChatIndexing => "chat_indexing",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 步骤标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 步骤状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// 依赖未满足
    Blocked,
    /// 依赖已满足，等待派发
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

/// 任务图节点
#[derive(Debug, Clone)]
pub struct StepNode {
    pub id: StepId,
    pub stage: StageKind,
    pub deps: Vec<StepId>,
    pub status: StepStatus,
    /// 容错步骤：上游失败不传染为SKIPPED，所有依赖终态后即可执行
    pub failure_tolerant: bool,
    /// 扇出兄弟的发现顺序下标
    pub fanout_index: usize,
}

impl StepNode {
    pub fn new(id: impl Into<String>, stage: StageKind, deps: &[&StepId]) -> Self {
        Self {
            id: StepId::new(id),
            stage,
            deps: deps.iter().map(|d| (*d).clone()).collect(),
            status: StepStatus::Blocked,
            failure_tolerant: false,
            fanout_index: 0,
        }
    }

    pub fn failure_tolerant(mut self) -> Self {
        self.failure_tolerant = true;
        self
    }

    pub fn with_fanout_index(mut self, index: usize) -> Self {
        self.fanout_index = index;
        self
    }
}

/// 任务图
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<StepNode>,
    index: HashMap<StepId, usize>,
}

impl TaskGraph {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 构建固定的九阶段拓扑
    ///
    /// PARALLEL_RESEARCH先以单个种子兄弟入图，规划完成后再扩展。
    pub fn build() -> Result<Self, GraphError> {
        let mut graph = Self::empty();

        let query = StepId::new("query_analysis");
        let discovery = StepId::new("source_discovery");
        let planning = StepId::new("planning");
        let research0 = StepId::new("parallel_research_0");
        let aggregation = StepId::new("aggregation");
        let reasoning = StepId::new("reasoning");
        let reporting = StepId::new("reporting");

        graph.add_step(StepNode::new("query_analysis", StageKind::QueryAnalysis, &[]))?;
        graph.add_step(StepNode::new(
            "source_discovery",
            StageKind::SourceDiscovery,
            &[&query],
        ))?;
        graph.add_step(StepNode::new(
            "planning",
            StageKind::Planning,
            &[&query, &discovery],
        ))?;
        graph.add_step(StepNode::new(
            "parallel_research_0",
            StageKind::ParallelResearch,
            &[&discovery, &planning],
        ))?;
        graph.add_step(StepNode::new(
            "aggregation",
            StageKind::Aggregation,
            &[&research0],
        ))?;
        graph.add_step(StepNode::new("reasoning", StageKind::Reasoning, &[&aggregation]))?;
        graph.add_step(
            StepNode::new("reporting", StageKind::Reporting, &[&reasoning]).failure_tolerant(),
        )?;
        graph.add_step(StepNode::new(
            "visualization",
            StageKind::Visualization,
            &[&reporting],
        ))?;
        graph.add_step(StepNode::new(
            "chat_indexing",
            StageKind::ChatIndexing,
            &[&reporting],
        ))?;

        graph.validate()?;
        Ok(graph)
    }

    /// 插入节点并做引用完整性检查（无环校验由validate承担）
    pub fn add_step(&mut self, node: StepNode) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateStep(node.id.to_string()));
        }
        for dep in &node.deps {
            if !self.index.contains_key(dep) {
                return Err(GraphError::UnknownDependency {
                    step: node.id.to_string(),
                    dep: dep.to_string(),
                });
            }
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// 允许前向引用的插入，随后必须调用validate
    pub fn add_step_unchecked(&mut self, node: StepNode) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateStep(node.id.to_string()));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Kahn拓扑排序校验无环
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut in_degree: HashMap<&StepId, usize> = HashMap::new();
        for node in &self.nodes {
            in_degree.entry(&node.id).or_insert(0);
            for dep in &node.deps {
                if !self.index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency {
                        step: node.id.to_string(),
                        dep: dep.to_string(),
                    });
                }
                *in_degree.entry(&node.id).or_insert(0) += 1;
            }
        }

        let mut queue: Vec<&StepId> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;

        while let Some(id) = queue.pop() {
            visited += 1;
            for node in &self.nodes {
                if node.deps.contains(id) {
                    let degree = in_degree.get_mut(&node.id).expect("node in map");
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(&node.id);
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            let culprit = in_degree
                .iter()
                .find(|(_, d)| **d > 0)
                .map(|(id, _)| id.to_string())
                .unwrap_or_default();
            return Err(GraphError::Cycle(culprit));
        }
        Ok(())
    }

    /// 将PARALLEL_RESEARCH扩展为total个兄弟步骤，返回新增的步骤ID
    ///
    /// 由规划步骤的完成处理器在调度器独占图访问下原子执行。
    pub fn expand_research_fanout(&mut self, total: usize) -> Result<Vec<StepId>, GraphError> {
        let seed_idx = *self
            .index
            .get(&StepId::new("parallel_research_0"))
            .ok_or_else(|| GraphError::UnknownStep("parallel_research_0".to_string()))?;
        let seed_deps = self.nodes[seed_idx].deps.clone();

        let mut added = Vec::new();
        for i in 1..total {
            let id = StepId::new(format!("parallel_research_{}", i));
            if self.index.contains_key(&id) {
                continue;
            }
            let node = StepNode {
                id: id.clone(),
                stage: StageKind::ParallelResearch,
                deps: seed_deps.clone(),
                status: StepStatus::Blocked,
                failure_tolerant: false,
                fanout_index: i,
            };
            self.add_step(node)?;
            added.push(id);
        }

        // 聚合步骤等待全部兄弟
        let agg_idx = *self
            .index
            .get(&StepId::new("aggregation"))
            .ok_or_else(|| GraphError::UnknownStep("aggregation".to_string()))?;
        for id in &added {
            self.nodes[agg_idx].deps.push(id.clone());
        }

        self.validate()?;
        Ok(added)
    }

    fn node(&self, id: &StepId) -> Option<&StepNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: &StepId) -> Option<&mut StepNode> {
        let idx = *self.index.get(id)?;
        Some(&mut self.nodes[idx])
    }

    pub fn status(&self, id: &StepId) -> Option<StepStatus> {
        self.node(id).map(|n| n.status)
    }

    pub fn stage(&self, id: &StepId) -> Option<StageKind> {
        self.node(id).map(|n| n.stage)
    }

    pub fn deps(&self, id: &StepId) -> Vec<StepId> {
        self.node(id).map(|n| n.deps.clone()).unwrap_or_default()
    }

    pub fn fanout_index(&self, id: &StepId) -> usize {
        self.node(id).map(|n| n.fanout_index).unwrap_or(0)
    }

    pub fn is_failure_tolerant(&self, id: &StepId) -> bool {
        self.node(id).map(|n| n.failure_tolerant).unwrap_or(false)
    }

    pub fn set_status(&mut self, id: &StepId, status: StepStatus) -> Result<(), GraphError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::UnknownStep(id.to_string()))?;
        node.status = status;
        Ok(())
    }

    /// 失败传染：非容错步骤若有FAILED/SKIPPED依赖，则标记为SKIPPED
    fn propagate_skips(&mut self) {
        loop {
            let mut doomed: Vec<StepId> = Vec::new();
            for node in &self.nodes {
                if node.status.is_terminal()
                    || node.status == StepStatus::Running
                    || node.failure_tolerant
                {
                    continue;
                }
                let has_dead_dep = node.deps.iter().any(|dep| {
                    matches!(
                        self.node(dep).map(|n| n.status),
                        Some(StepStatus::Failed) | Some(StepStatus::Skipped)
                    )
                });
                if has_dead_dep {
                    doomed.push(node.id.clone());
                }
            }
            if doomed.is_empty() {
                break;
            }
            for id in doomed {
                if let Some(node) = self.node_mut(&id) {
                    node.status = StepStatus::Skipped;
                }
            }
        }
    }

    fn deps_satisfied(&self, node: &StepNode) -> bool {
        if node.failure_tolerant {
            // 容错步骤：所有依赖到达终态即可执行
            node.deps
                .iter()
                .all(|dep| self.node(dep).map(|n| n.status.is_terminal()).unwrap_or(false))
        } else {
            node.deps.iter().all(|dep| {
                self.node(dep).map(|n| n.status) == Some(StepStatus::Succeeded)
            })
        }
    }

    /// 返回当前可派发的步骤，按(阶段下标, 扇出下标)确定性排序
    pub fn next_ready(&mut self) -> Vec<StepId> {
        self.propagate_skips();

        let promote: Vec<StepId> = self
            .nodes
            .iter()
            .filter(|n| n.status == StepStatus::Blocked && self.deps_satisfied(n))
            .map(|n| n.id.clone())
            .collect();
        for id in promote {
            if let Some(node) = self.node_mut(&id) {
                node.status = StepStatus::Ready;
            }
        }

        let mut ready: Vec<&StepNode> = self
            .nodes
            .iter()
            .filter(|n| n.status == StepStatus::Ready)
            .collect();
        ready.sort_by_key(|n| (n.stage.index(), n.fanout_index));
        ready.into_iter().map(|n| n.id.clone()).collect()
    }

    /// 所有步骤是否均到达终态
    pub fn is_resolved(&mut self) -> bool {
        self.propagate_skips();
        self.nodes.iter().all(|n| n.status.is_terminal())
    }

    /// 是否所有非SKIPPED步骤均SUCCEEDED（COMPLETE判定）
    pub fn all_non_skipped_succeeded(&self) -> bool {
        self.nodes
            .iter()
            .all(|n| matches!(n.status, StepStatus::Succeeded | StepStatus::Skipped))
    }

    /// 是否存在FAILED或SKIPPED步骤
    pub fn has_failures(&self) -> bool {
        self.nodes
            .iter()
            .any(|n| matches!(n.status, StepStatus::Failed | StepStatus::Skipped))
    }

    /// 未成功完成的阶段名（去重，按阶段顺序）
    pub fn incomplete_stages(&self) -> Vec<String> {
        let mut stages: Vec<StageKind> = self
            .nodes
            .iter()
            .filter(|n| n.status != StepStatus::Succeeded)
            .map(|n| n.stage)
            .collect();
        stages.sort_by_key(|s| s.index());
        stages.dedup();
        stages.into_iter().map(|s| s.as_str().to_string()).collect()
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// Include tests
#[cfg(test)]
mod tests;
