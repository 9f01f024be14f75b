//! 研究流水线 - 任务图、调度器、智能体步骤与运行控制

use anyhow::Result;
use uuid::Uuid;

pub mod agents;
pub mod context;
pub mod graph;
pub mod run;
pub mod scheduler;

pub use context::PipelineContext;
pub use run::{RunController, RunOutcome, RunStatus};

use crate::config::Config;

/// 用HTTP能力客户端启动一次新运行
pub async fn launch(config: Config, claim: &str) -> Result<RunOutcome> {
    let ctx = PipelineContext::new(config)?;
    launch_with_context(ctx, claim, None).await
}

/// 恢复指定run_id的运行（剩余步骤重新调度，已有产物不重算）
pub async fn resume(config: Config, run_id: &str) -> Result<RunOutcome> {
    let ctx = PipelineContext::new(config)?;
    launch_with_context(ctx, "", Some(run_id)).await
}

/// 用注入的上下文启动运行，测试与恢复共用入口
pub async fn launch_with_context(
    ctx: PipelineContext,
    claim: &str,
    resume_run_id: Option<&str>,
) -> Result<RunOutcome> {
    // 本运行用子取消令牌，多个运行共享同一上下文时互不取消
    let ctx = ctx.for_run();

    // 启动时清理超过保留时长的历史运行
    let purged = ctx.store.purge_expired().await?;
    if purged > 0 {
        println!("🧹 清理 {} 个过期运行目录", purged);
    }

    let run_id = match resume_run_id {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let controller = RunController::new(ctx);
    controller.execute(&run_id, claim).await
}
