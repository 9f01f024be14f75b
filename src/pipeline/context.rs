use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::capability::{
    EmbeddingProvider, HttpEmbeddingProvider, HttpLlmProvider, HttpSearchProvider, LlmProvider,
    SearchProvider,
};
use crate::config::Config;
use crate::store::ArtifactStore;

/// 流水线上下文 - 显式传递的共享句柄集合
///
/// 工作槽信号量与产物存储是跨并发运行共享的仅有资源；
/// 不使用任何隐式单例，保证多运行可隔离测试。
#[derive(Clone)]
pub struct PipelineContext {
    /// 配置
    pub config: Config,
    /// 搜索能力
    pub search: Arc<dyn SearchProvider>,
    /// LLM能力
    pub llm: Arc<dyn LlmProvider>,
    /// 向量嵌入能力
    pub embedding: Arc<dyn EmbeddingProvider>,
    /// 产物存储
    pub store: Arc<ArtifactStore>,
    /// 工作槽 - 跨所有运行的并发步骤上限
    pub workers: Arc<Semaphore>,
    /// 协作式取消令牌
    pub cancel: CancellationToken,
}

impl PipelineContext {
    /// 用HTTP能力客户端创建上下文
    pub fn new(config: Config) -> Result<Self> {
        let search = Arc::new(HttpSearchProvider::new(config.search.clone())?);
        let llm = Arc::new(HttpLlmProvider::new(config.llm.clone())?);
        let embedding = Arc::new(HttpEmbeddingProvider::new(config.embedding.clone())?);
        Ok(Self::with_providers(config, search, llm, embedding))
    }

    /// 注入能力实现创建上下文（测试用mock走这里）
    pub fn with_providers(
        config: Config,
        search: Arc<dyn SearchProvider>,
        llm: Arc<dyn LlmProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let store = Arc::new(ArtifactStore::new(config.store.clone()));
        let workers = Arc::new(Semaphore::new(config.pipeline.max_parallel_agents.max(1)));
        Self {
            config,
            search,
            llm,
            embedding,
            store,
            workers,
            cancel: CancellationToken::new(),
        }
    }

    /// 派生单个运行专用的上下文
    ///
    /// 工作槽与产物存储照常共享（跨运行的并发上限由此生效）；
    /// 取消令牌换成子令牌，取消一个运行不波及兄弟运行，
    /// 取消父令牌仍会停掉全部运行。
    pub fn for_run(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }

    /// 详细日志
    pub fn log_verbose(&self, message: &str) {
        if self.config.verbose {
            println!("   {}", message);
        }
    }
}
