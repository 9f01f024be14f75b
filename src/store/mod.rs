//! 产物存储 - 以(运行ID, 步骤ID)为键的一次写入JSON持久化
//!
//! 每个成功步骤的产出落盘为 `<artifacts_dir>/<run_id>/<step_id>.json`。
//! 写入依赖文件系统的create_new原子语义：同键二次写入必然失败，
//! 保证产物不可变与按键线性化。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::StoreConfig;

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 同键二次写入 - 属于编程或并发缺陷，对该步骤致命
    #[error("artifact already exists for run {run_id} step {step_id}")]
    DuplicateWrite { run_id: String, step_id: String },

    #[error("artifact not found for run {run_id} step {step_id}")]
    NotFound { run_id: String, step_id: String },

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// 不可变的步骤产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub run_id: String,
    pub step_id: String,
    /// 产出该产物的阶段种类名
    pub stage: String,
    pub payload: Value,
    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(run_id: &str, step_id: &str, stage: &str, payload: Value) -> Self {
        Self {
            run_id: run_id.to_string(),
            step_id: step_id.to_string(),
            stage: stage.to_string(),
            payload,
            produced_at: Utc::now(),
        }
    }

    /// 反序列化payload为具体类型
    pub fn typed<T: for<'de> Deserialize<'de>>(&self) -> Option<T> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// 产物存储管理器
pub struct ArtifactStore {
    config: StoreConfig,
}

impl ArtifactStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.config.artifacts_dir.join(run_id)
    }

    fn artifact_path(&self, run_id: &str, step_id: &str) -> PathBuf {
        self.run_dir(run_id).join(format!("{}.json", step_id))
    }

    /// 写入产物，一次写入语义：同键已存在时返回DuplicateWrite
    pub async fn put(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let path = self.artifact_path(&artifact.run_id, &artifact.step_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // create_new保证检查与创建的原子性
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::DuplicateWrite {
                    run_id: artifact.run_id.clone(),
                    step_id: artifact.step_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let content = serde_json::to_vec_pretty(artifact)?;
        file.write_all(&content).await?;
        file.flush().await?;
        Ok(())
    }

    /// 读取产物
    pub async fn get(&self, run_id: &str, step_id: &str) -> Result<Artifact, StoreError> {
        let path = self.artifact_path(run_id, step_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    run_id: run_id.to_string(),
                    step_id: step_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// 产物是否存在
    pub async fn has(&self, run_id: &str, step_id: &str) -> bool {
        fs::try_exists(self.artifact_path(run_id, step_id))
            .await
            .unwrap_or(false)
    }

    /// 列出一次运行的全部产物，按产出时间、步骤ID排序
    ///
    /// 无法解码的产物文件按缺失处理（恢复时该步骤会重新执行）。
    pub async fn list_for_run(&self, run_id: &str) -> Result<Vec<Artifact>, StoreError> {
        let dir = self.run_dir(run_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path).await
                && let Ok(artifact) = serde_json::from_str::<Artifact>(&content)
            {
                artifacts.push(artifact);
            }
        }

        artifacts.sort_by(|a, b| {
            a.produced_at
                .cmp(&b.produced_at)
                .then_with(|| a.step_id.cmp(&b.step_id))
        });
        Ok(artifacts)
    }

    /// 丢弃运行目录下无法解码的产物文件，返回丢弃数量
    ///
    /// 中断的半截写入按缺失处理；文件不删掉的话，对应步骤重新
    /// 执行后的写入会撞上一次写入语义。恢复扫描前调用。
    pub async fn discard_undecodable(&self, run_id: &str) -> Result<usize, StoreError> {
        let dir = self.run_dir(run_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut discarded = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let decodable = fs::read_to_string(&path)
                .await
                .ok()
                .is_some_and(|content| serde_json::from_str::<Artifact>(&content).is_ok());
            if !decodable {
                fs::remove_file(&path).await?;
                discarded += 1;
            }
        }
        Ok(discarded)
    }

    /// 清理超过保留时长的运行目录，返回清理数量
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let retain = Duration::from_secs(self.config.retain_hours * 3600);
        let now = SystemTime::now();

        let mut entries = match fs::read_dir(&self.config.artifacts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut purged = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if let Ok(age) = now.duration_since(modified)
                && age > retain
            {
                fs::remove_dir_all(&path).await?;
                purged += 1;
            }
        }
        Ok(purged)
    }
}

// Include tests
#[cfg(test)]
mod tests;
