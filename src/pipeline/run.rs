//! 运行控制器 - 单次核查运行的生命周期管理
//!
//! 负责运行ID、恢复扫描、运行级超时与终态判定。终态规则：
//! 全部非SKIPPED步骤成功为COMPLETE；有失败但报告产物存在为
//! PARTIAL；报告也没有为FAILED；取消且未完整成功为CANCELLED。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::{Duration, sleep};

use crate::pipeline::agents::AgentRegistry;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::graph::{StageKind, StepStatus, TaskGraph};
use crate::pipeline::scheduler::Scheduler;
use crate::types::{PlanningOutput, StructuredClaim, VerdictReport};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    Complete,
    Partial,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Complete => "COMPLETE",
            RunStatus::Partial => "PARTIAL",
            RunStatus::Failed => "FAILED",
            RunStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一次运行的最终结果
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    /// 报告产物（COMPLETE与PARTIAL时存在）
    pub report: Option<VerdictReport>,
    /// 未成功完成的阶段名
    pub incomplete_stages: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// 运行控制器
pub struct RunController {
    ctx: PipelineContext,
}

impl RunController {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// 执行一次运行（run_id对应已有产物目录时为恢复执行）
    pub async fn execute(&self, run_id: &str, claim: &str) -> Result<RunOutcome> {
        let started_at = Utc::now();

        // 环是致命错误，运行在启动前即失败
        let mut graph = match TaskGraph::build() {
            Ok(graph) => graph,
            Err(e) => {
                println!("❌ 任务图非法: {}", e);
                return Ok(RunOutcome {
                    run_id: run_id.to_string(),
                    status: RunStatus::Failed,
                    report: None,
                    incomplete_stages: StageKind::ALL
                        .iter()
                        .map(|s| s.as_str().to_string())
                        .collect(),
                    started_at,
                    finished_at: Utc::now(),
                });
            }
        };

        let claim = self.restore_progress(run_id, claim, &mut graph).await?;

        println!("🚦 运行 {} 进入 {}", run_id, RunStatus::Running);

        // 运行级超时等价于到期的隐式取消
        let watchdog = self.ctx.config.pipeline.run_timeout_seconds.map(|secs| {
            let cancel = self.ctx.cancel.clone();
            tokio::spawn(async move {
                sleep(Duration::from_secs(secs)).await;
                println!("⏰ 运行超时（{}s），触发取消", secs);
                cancel.cancel();
            })
        });

        let scheduler = Scheduler::new(
            self.ctx.clone(),
            AgentRegistry::standard(),
            run_id,
            &claim,
        );
        let run_result = scheduler.run(&mut graph).await;

        if let Some(handle) = watchdog {
            handle.abort();
        }
        run_result?;

        let outcome = self.finalize(run_id, &graph, started_at).await?;
        println!("🏁 运行 {} 终态 {}", run_id, outcome.status);
        Ok(outcome)
    }

    /// 恢复扫描：已有产物的步骤直接标记为SUCCEEDED，不再重算
    ///
    /// 规划产物存在时先扩展扇出，保证兄弟步骤ID在图中。
    /// 返回实际使用的断言文本（恢复时以存档为准）。
    async fn restore_progress(
        &self,
        run_id: &str,
        claim: &str,
        graph: &mut TaskGraph,
    ) -> Result<String> {
        // 半截写入的产物先丢弃，否则重跑步骤的写入会撞一次写入语义
        let discarded = self.ctx.store.discard_undecodable(run_id).await?;
        if discarded > 0 {
            println!("🧽 丢弃 {} 个无法解码的产物文件", discarded);
        }

        let artifacts = self.ctx.store.list_for_run(run_id).await?;
        if artifacts.is_empty() {
            return Ok(claim.to_string());
        }
        println!("♻️ 恢复运行 {}，已有 {} 个产物", run_id, artifacts.len());

        if let Some(planning) = artifacts
            .iter()
            .find(|a| a.step_id == StageKind::Planning.base_step_id())
            && let Some(plan) = planning.typed::<PlanningOutput>()
        {
            let total = plan
                .research_questions
                .len()
                .clamp(1, self.ctx.config.pipeline.max_research_fanout);
            graph
                .expand_research_fanout(total)
                .context("fanout expansion during resume")?;
        }

        let known: Vec<String> = graph.step_ids().iter().map(|id| id.to_string()).collect();
        for artifact in &artifacts {
            if known.contains(&artifact.step_id) {
                graph.set_status(
                    &crate::pipeline::graph::StepId::new(artifact.step_id.clone()),
                    StepStatus::Succeeded,
                )?;
            }
        }

        // 断言文本以存档的解析产物为准
        let restored_claim = artifacts
            .iter()
            .find(|a| a.step_id == StageKind::QueryAnalysis.base_step_id())
            .and_then(|a| a.typed::<StructuredClaim>())
            .map(|s| s.original_claim);
        Ok(restored_claim.unwrap_or_else(|| claim.to_string()))
    }

    /// 终态判定与报告装载
    async fn finalize(
        &self,
        run_id: &str,
        graph: &TaskGraph,
        started_at: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let fully_succeeded = graph.all_non_skipped_succeeded() && !graph.has_failures();

        let status = if fully_succeeded {
            RunStatus::Complete
        } else if self.ctx.cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if self
            .ctx
            .store
            .has(run_id, StageKind::Reporting.base_step_id())
            .await
        {
            // 降级报告存在，运行部分成功
            RunStatus::Partial
        } else {
            RunStatus::Failed
        };

        let report = match self
            .ctx
            .store
            .get(run_id, StageKind::Reporting.base_step_id())
            .await
        {
            Ok(artifact) => artifact.typed::<VerdictReport>(),
            Err(_) => None,
        };

        Ok(RunOutcome {
            run_id: run_id.to_string(),
            status,
            report,
            incomplete_stages: graph.incomplete_stages(),
            started_at,
            finished_at: Utc::now(),
        })
    }
}
