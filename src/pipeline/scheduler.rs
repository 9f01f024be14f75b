//! 调度器 - 任务图的有界并发执行引擎
//!
//! 工作槽信号量限制所有在途步骤的总数；每个步骤在独立任务中
//! 执行，带单步超时与对可重试故障的指数退避。完成协议对所有
//! 阶段一致：读上游产物、执行、一次写入自己的产物、更新图状态。

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::Rng;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinSet;
use tokio::time::{Duration, sleep, timeout};

use crate::capability::CapabilityError;
use crate::pipeline::agents::{AgentRegistry, AgentStep, StepInput, UpstreamArtifacts};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::{StageKind, StepId, StepStatus, TaskGraph};
use crate::store::{Artifact, StoreError};
use crate::types::PlanningOutput;

/// 步骤ID -> 阶段种类（扇出兄弟共享同一阶段）
pub(crate) fn stage_of_step_id(step_id: &str) -> Option<StageKind> {
    if step_id.starts_with("parallel_research_") {
        return Some(StageKind::ParallelResearch);
    }
    match step_id {
        "query_analysis" => Some(StageKind::QueryAnalysis),
        "source_discovery" => Some(StageKind::SourceDiscovery),
        "planning" => Some(StageKind::Planning),
        "aggregation" => Some(StageKind::Aggregation),
        "reasoning" => Some(StageKind::Reasoning),
        "reporting" => Some(StageKind::Reporting),
        "visualization" => Some(StageKind::Visualization),
        "chat_indexing" => Some(StageKind::ChatIndexing),
        _ => None,
    }
}

/// 单步执行的内部结局
enum StepOutcome {
    Succeeded(serde_json::Value),
    Failed(String),
    Cancelled,
}

/// 有界并发调度器
pub struct Scheduler {
    ctx: PipelineContext,
    registry: AgentRegistry,
    run_id: String,
    claim: String,
}

impl Scheduler {
    pub fn new(ctx: PipelineContext, registry: AgentRegistry, run_id: &str, claim: &str) -> Self {
        Self {
            ctx,
            registry,
            run_id: run_id.to_string(),
            claim: claim.to_string(),
        }
    }

    /// 驱动任务图直至全部步骤终态（或取消后在途步骤清空）
    pub async fn run(&self, graph: &mut TaskGraph) -> Result<()> {
        let mut inflight: JoinSet<(StepId, StepOutcome)> = JoinSet::new();

        loop {
            if !self.ctx.cancel.is_cancelled() {
                for id in graph.next_ready() {
                    // 在途为空时阻塞等待工作槽，保证本运行总能推进；
                    // 否则非阻塞获取，拿不到就等下一次结算后再派发
                    let permit = if inflight.is_empty() {
                        tokio::select! {
                            permit = Arc::clone(&self.ctx.workers).acquire_owned() => {
                                permit.context("worker semaphore closed")?
                            }
                            _ = self.ctx.cancel.cancelled() => break,
                        }
                    } else {
                        match Arc::clone(&self.ctx.workers).try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => break,
                        }
                    };
                    self.dispatch(graph, &id, permit, &mut inflight)?;
                }
            }

            if inflight.is_empty() {
                break;
            }

            if let Some(joined) = inflight.join_next().await {
                let (id, outcome) = joined.context("step task panicked")?;
                self.settle(graph, &id, outcome).await?;
            }
        }

        if self.ctx.cancel.is_cancelled() {
            self.skip_pending(graph);
        }
        Ok(())
    }

    /// 派发单个步骤：标记RUNNING并在独立任务中执行
    fn dispatch(
        &self,
        graph: &mut TaskGraph,
        id: &StepId,
        permit: OwnedSemaphorePermit,
        inflight: &mut JoinSet<(StepId, StepOutcome)>,
    ) -> Result<()> {
        let stage = graph
            .stage(id)
            .with_context(|| format!("unknown step: {}", id))?;
        let agent = self
            .registry
            .get(stage)
            .with_context(|| format!("no agent registered for stage {}", stage))?;
        let deps = graph.deps(id);
        let tolerant = graph.is_failure_tolerant(id);
        let fanout_index = graph.fanout_index(id);
        graph.set_status(id, StepStatus::Running)?;
        self.ctx
            .log_verbose(&format!("🚀 派发步骤 {} ({})", id, stage));

        let ctx = self.ctx.clone();
        let run_id = self.run_id.clone();
        let claim = self.claim.clone();
        let step_id = id.clone();
        inflight.spawn(async move {
            let _permit = permit;
            let outcome =
                execute_step(&ctx, agent, &run_id, &claim, &step_id, fanout_index, &deps, tolerant)
                    .await;
            (step_id, outcome)
        });
        Ok(())
    }

    /// 结算单个步骤：落盘产物、更新图、必要时扩展扇出
    async fn settle(&self, graph: &mut TaskGraph, id: &StepId, outcome: StepOutcome) -> Result<()> {
        match outcome {
            StepOutcome::Succeeded(payload) => {
                let stage = graph
                    .stage(id)
                    .with_context(|| format!("unknown step: {}", id))?;
                let artifact = Artifact::new(&self.run_id, id.as_str(), stage.as_str(), payload);
                match self.ctx.store.put(&artifact).await {
                    Ok(()) => {
                        graph.set_status(id, StepStatus::Succeeded)?;
                        println!("   ✅ 步骤 {} 完成", id);
                        if stage == StageKind::Planning {
                            self.expand_fanout(graph, &artifact)?;
                        }
                    }
                    Err(StoreError::DuplicateWrite { .. }) => {
                        // 一次写入语义被违反，对该步骤致命
                        graph.set_status(id, StepStatus::Failed)?;
                        println!("   ❌ 步骤 {} 产物重复写入", id);
                    }
                    Err(e) => {
                        graph.set_status(id, StepStatus::Failed)?;
                        println!("   ❌ 步骤 {} 产物写入失败: {}", id, e);
                    }
                }
            }
            StepOutcome::Failed(reason) => {
                graph.set_status(id, StepStatus::Failed)?;
                println!("   ❌ 步骤 {} 失败: {}", id, reason);
            }
            StepOutcome::Cancelled => {
                graph.set_status(id, StepStatus::Skipped)?;
                println!("   ⏹️ 步骤 {} 已取消", id);
            }
        }
        Ok(())
    }

    /// 规划产物决定并行研究的实际扇出规模
    fn expand_fanout(&self, graph: &mut TaskGraph, artifact: &Artifact) -> Result<()> {
        let plan: PlanningOutput = artifact
            .typed()
            .context("planning artifact payload is not a valid plan")?;
        let total = plan
            .research_questions
            .len()
            .clamp(1, self.ctx.config.pipeline.max_research_fanout);
        let added = graph.expand_research_fanout(total)?;
        if !added.is_empty() {
            self.ctx
                .log_verbose(&format!("🔀 研究扇出扩展为 {} 个兄弟步骤", total));
        }
        Ok(())
    }

    /// 取消后把所有未终态步骤标记为SKIPPED
    fn skip_pending(&self, graph: &mut TaskGraph) {
        for id in graph.step_ids() {
            if let Some(status) = graph.status(&id)
                && !status.is_terminal()
            {
                let _ = graph.set_status(&id, StepStatus::Skipped);
            }
        }
    }
}

/// 执行单个步骤：读上游产物、带超时执行、对可重试故障退避重试
#[allow(clippy::too_many_arguments)]
async fn execute_step(
    ctx: &PipelineContext,
    agent: Arc<dyn AgentStep>,
    run_id: &str,
    claim: &str,
    step_id: &StepId,
    fanout_index: usize,
    deps: &[StepId],
    tolerant: bool,
) -> StepOutcome {
    // 容错步骤看运行目录下实际存在的全部产物，缺失不阻止执行
    let artifacts = if tolerant {
        match ctx.store.list_for_run(run_id).await {
            Ok(artifacts) => artifacts,
            Err(e) => return StepOutcome::Failed(e.to_string()),
        }
    } else {
        let mut artifacts = Vec::with_capacity(deps.len());
        for dep in deps {
            match ctx.store.get(run_id, dep.as_str()).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => return StepOutcome::Failed(format!("dependency artifact: {}", e)),
            }
        }
        artifacts
    };

    let input = StepInput {
        run_id: run_id.to_string(),
        claim: claim.to_string(),
        step_id: step_id.clone(),
        fanout_index,
        upstream: UpstreamArtifacts::from_artifacts(artifacts, stage_of_step_id),
    };

    let attempts = ctx.config.pipeline.retry_attempts.max(1);
    let step_timeout = Duration::from_secs(ctx.config.pipeline.step_timeout_seconds);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        // 取消是协作式的：在途调用跑完（或超时），产物照常落盘
        let result = match timeout(step_timeout, agent.execute(ctx, &input)).await {
            Ok(result) => result,
            // 单步超时按可重试故障处理
            Err(_) => Err(CapabilityError::Timeout(ctx.config.pipeline.step_timeout_seconds)),
        };

        match result {
            Ok(payload) => return StepOutcome::Succeeded(payload),
            Err(e) if e.is_retryable() && attempt < attempts => {
                // 已取消的运行不再投入重试
                if ctx.cancel.is_cancelled() {
                    return StepOutcome::Cancelled;
                }
                let base = ctx
                    .config
                    .pipeline
                    .retry_delay_ms
                    .saturating_mul(1u64 << (attempt - 1).min(16));
                let jitter = rand::rng().random_range(0..=base / 4);
                ctx.log_verbose(&format!(
                    "🔄 步骤 {} 第{}次尝试失败（{}），{}ms后重试",
                    step_id,
                    attempt,
                    e,
                    base + jitter
                ));
                tokio::select! {
                    _ = sleep(Duration::from_millis(base + jitter)) => {}
                    _ = ctx.cancel.cancelled() => return StepOutcome::Cancelled,
                }
            }
            Err(e) => return StepOutcome::Failed(e.to_string()),
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
