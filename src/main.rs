use anyhow::{Result, bail};
use clap::Parser;

use perspect_rs::pipeline::{launch, resume};

#[tokio::main]
async fn main() -> Result<()> {
    let args = perspect_rs::cli::Args::parse();
    let claim = args.claim.clone();
    let resume_run_id = args.resume.clone();
    let config = args.into_config();

    let outcome = match (resume_run_id, claim) {
        (Some(run_id), _) => resume(config, &run_id).await?,
        (None, Some(claim)) => launch(config, &claim).await?,
        (None, None) => bail!("a claim to fact-check is required (or --resume <run_id>)"),
    };

    println!();
    println!("📦 运行ID: {}", outcome.run_id);
    println!("🏷️ 状态: {}", outcome.status);
    if let Some(report) = &outcome.report {
        println!(
            "⚖️ 结论: {} (置信度 {:.0}%)",
            report.verdict,
            report.confidence * 100.0
        );
        println!("📝 {}", report.executive_summary);
        if report.is_degraded() {
            println!("⚠️ 降级报告，缺失阶段: {}", report.incomplete_stages.join(", "));
        }
    } else if !outcome.incomplete_stages.is_empty() {
        println!("⚠️ 未完成阶段: {}", outcome.incomplete_stages.join(", "));
    }

    Ok(())
}
