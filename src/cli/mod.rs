use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Perspect-RS - 由Rust与AI驱动的断言核查研究引擎
#[derive(Parser, Debug)]
#[command(name = "perspect-rs")]
#[command(
    about = "AI-based deep-research orchestration engine for claim fact-checking. It analyzes a claim, discovers and weighs sources, runs parallel research agents, and produces an evidence-backed verdict report."
)]
#[command(version)]
pub struct Args {
    /// 待核查的断言文本
    pub claim: Option<String>,

    /// 恢复指定run_id的运行
    #[arg(long)]
    pub resume: Option<String>,

    /// 输出路径
    #[arg(short, long, default_value = "./perspect.reports")]
    pub output_path: PathBuf,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM模型名称
    #[arg(long)]
    pub model: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// 搜索API基地址
    #[arg(long)]
    pub search_api_base_url: Option<String>,

    /// 搜索API KEY
    #[arg(long)]
    pub search_api_key: Option<String>,

    /// 最大tokens数
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// 温度参数
    #[arg(long)]
    pub temperature: Option<f64>,

    /// 工作槽数量（并发步骤上限）
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// 并行研究的最大扇出
    #[arg(long)]
    pub max_fanout: Option<usize>,

    /// 单步执行超时（秒）
    #[arg(long)]
    pub step_timeout: Option<u64>,

    /// 运行级超时（秒）
    #[arg(long)]
    pub run_timeout: Option<u64>,
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            // 如果显式指定了配置文件路径，从该路径加载
            Config::from_file(config_path).unwrap_or_else(|_| {
                panic!("⚠️ 警告: 无法读取配置文件 {:?}", config_path)
            })
        } else {
            // 如果没有显式指定配置文件，尝试从默认位置加载
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .join("perspect.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path).unwrap_or_else(|_| {
                    panic!(
                        "⚠️ 警告: 无法读取默认配置文件 {:?}",
                        default_config_path
                    )
                })
            } else {
                // 默认配置文件不存在，使用默认值
                Config::default()
            }
        };

        // 覆盖配置文件中的设置
        config.output_path = self.output_path;

        // 覆盖LLM配置
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }

        // 覆盖搜索配置
        if let Some(search_api_base_url) = self.search_api_base_url {
            config.search.api_base_url = search_api_base_url;
        }
        if let Some(search_api_key) = self.search_api_key {
            config.search.api_key = search_api_key;
        }

        // 覆盖流水线配置
        if let Some(max_parallels) = self.max_parallels {
            config.pipeline.max_parallel_agents = max_parallels;
        }
        if let Some(max_fanout) = self.max_fanout {
            config.pipeline.max_research_fanout = max_fanout;
        }
        if let Some(step_timeout) = self.step_timeout {
            config.pipeline.step_timeout_seconds = step_timeout;
        }
        if let Some(run_timeout) = self.run_timeout {
            config.pipeline.run_timeout_seconds = Some(run_timeout);
        }

        config.verbose = self.verbose;

        config
    }
}

// Include tests
#[cfg(test)]
mod tests;
