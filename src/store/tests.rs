#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::store::{Artifact, ArtifactStore, StoreError};
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(StoreConfig {
            artifacts_dir: dir.path().join("artifacts"),
            retain_hours: 72,
        })
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let artifact = Artifact::new("run-1", "query_analysis", "QUERY_ANALYSIS", json!({"x": 1}));
        store.put(&artifact).await.unwrap();

        let loaded = store.get("run-1", "query_analysis").await.unwrap();
        assert_eq!(loaded.run_id, "run-1");
        assert_eq!(loaded.step_id, "query_analysis");
        assert_eq!(loaded.payload, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_write_once_rejects_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = Artifact::new("run-1", "planning", "PLANNING", json!({"v": "first"}));
        store.put(&first).await.unwrap();

        let second = Artifact::new("run-1", "planning", "PLANNING", json!({"v": "second"}));
        let err = store.put(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateWrite { .. }));

        // 已存储的产物保持不变
        let loaded = store.get("run-1", "planning").await.unwrap();
        assert_eq!(loaded.payload, json!({"v": "first"}));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let err = store.get("run-x", "reasoning").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(!store.has("run-x", "reasoning").await);
    }

    #[tokio::test]
    async fn test_list_for_run_ordered() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for step in ["query_analysis", "source_discovery", "planning"] {
            let artifact = Artifact::new("run-1", step, "STAGE", json!({"step": step}));
            store.put(&artifact).await.unwrap();
            // 保证produced_at单调递增
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        // 另一运行的产物不应混入
        store
            .put(&Artifact::new("run-2", "planning", "PLANNING", json!({})))
            .await
            .unwrap();

        let artifacts = store.list_for_run("run-1").await.unwrap();
        assert_eq!(artifacts.len(), 3);
        assert_eq!(artifacts[0].step_id, "query_analysis");
        assert_eq!(artifacts[1].step_id, "source_discovery");
        assert_eq!(artifacts[2].step_id, "planning");
    }

    #[tokio::test]
    async fn test_list_for_unknown_run_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list_for_run("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discard_undecodable_then_rewrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .put(&Artifact::new("run-1", "query_analysis", "QUERY_ANALYSIS", json!({})))
            .await
            .unwrap();
        // 模拟崩溃留下的半截产物文件
        let truncated = dir.path().join("artifacts/run-1/planning.json");
        std::fs::write(&truncated, r#"{"run_id": "run-1", "step_"#).unwrap();

        let discarded = store.discard_undecodable("run-1").await.unwrap();
        assert_eq!(discarded, 1);

        // 完好的产物不受影响
        let artifacts = store.list_for_run("run-1").await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].step_id, "query_analysis");

        // 丢弃后同键写入不再被一次写入语义拒绝
        store
            .put(&Artifact::new("run-1", "planning", "PLANNING", json!({"v": 1})))
            .await
            .unwrap();
        assert!(store.has("run-1", "planning").await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let dir = TempDir::new().unwrap();
        // 保留0小时：任何已有运行目录都视为过期
        let store = ArtifactStore::new(StoreConfig {
            artifacts_dir: dir.path().join("artifacts"),
            retain_hours: 0,
        });

        store
            .put(&Artifact::new("run-old", "planning", "PLANNING", json!({})))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let purged = store.purge_expired().await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.list_for_run("run-old").await.unwrap().is_empty());
    }
}
