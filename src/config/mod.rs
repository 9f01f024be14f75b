use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 内部工作目录路径 (.perspect)
    pub internal_path: PathBuf,

    /// 报告输出路径
    pub output_path: PathBuf,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 搜索能力配置
    pub search: SearchConfig,

    /// 向量嵌入配置
    pub embedding: EmbeddingConfig,

    /// 流水线调度配置
    pub pipeline: PipelineConfig,

    /// 产物存储配置
    pub store: StoreConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址（OpenAI兼容）
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 单次HTTP请求超时（秒）
    pub timeout_seconds: u64,
}

/// 搜索能力配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// 搜索API KEY
    pub api_key: String,

    /// 搜索API基地址
    pub api_base_url: String,

    /// 单次检索的最大结果数
    pub max_results: usize,

    /// 结果入选的最低相关性
    pub min_relevance: f64,

    /// 单次HTTP请求超时（秒）
    pub timeout_seconds: u64,
}

/// 向量嵌入配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// 嵌入API KEY
    pub api_key: String,

    /// 嵌入API基地址（OpenAI风格）
    pub api_base_url: String,

    /// 嵌入模型名称
    pub model: String,

    /// 向量维度
    pub dimension: usize,

    /// 最近邻查询的top_k
    pub top_k: usize,

    /// 单次HTTP请求超时（秒）
    pub timeout_seconds: u64,
}

/// 流水线调度配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// 工作槽数量 - 跨所有运行的并发步骤上限
    pub max_parallel_agents: usize,

    /// 单步执行超时（秒），超时按可重试故障处理
    pub step_timeout_seconds: u64,

    /// 运行级超时（秒），到期等价于隐式取消；None为不限
    pub run_timeout_seconds: Option<u64>,

    /// 并行研究的最大扇出兄弟数
    pub max_research_fanout: usize,

    /// 可重试故障的最大尝试次数
    pub retry_attempts: u32,

    /// 重试基础间隔（毫秒），按指数退避增长
    pub retry_delay_ms: u64,
}

/// 产物存储配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// 产物根目录
    pub artifacts_dir: PathBuf,

    /// 产物保留时长（小时），过期运行在启动时清理
    pub retain_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_path: PathBuf::from("./.perspect"),
            output_path: PathBuf::from("./perspect.reports"),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
            pipeline: PipelineConfig::default(),
            store: StoreConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("PERSPECT_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            max_tokens: 8192,
            temperature: 0.3,
            timeout_seconds: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("PERSPECT_SEARCH_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://serpapi.com"),
            max_results: 20,
            min_relevance: 0.6,
            timeout_seconds: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("PERSPECT_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model: String::from("all-MiniLM-L6-v2"),
            dimension: 384,
            top_k: 10,
            timeout_seconds: 60,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_parallel_agents: 5,
            step_timeout_seconds: 300,
            run_timeout_seconds: None,
            max_research_fanout: 5,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from(".perspect/artifacts"),
            retain_hours: 72,
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;
