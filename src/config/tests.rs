#[cfg(test)]
mod tests {
    use crate::config::Config;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.internal_path, PathBuf::from("./.perspect"));
        assert_eq!(config.output_path, PathBuf::from("./perspect.reports"));
        assert!(!config.verbose);

        assert_eq!(config.pipeline.max_parallel_agents, 5);
        assert_eq!(config.pipeline.step_timeout_seconds, 300);
        assert!(config.pipeline.run_timeout_seconds.is_none());
        assert_eq!(config.pipeline.max_research_fanout, 5);
        assert_eq!(config.pipeline.retry_attempts, 3);
        assert_eq!(config.pipeline.retry_delay_ms, 1000);

        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.search.min_relevance, 0.6);

        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.embedding.top_k, 10);

        assert_eq!(config.store.artifacts_dir, PathBuf::from(".perspect/artifacts"));
        assert_eq!(config.store.retain_hours, 72);
    }

    #[test]
    fn test_llm_config_default() {
        let config = Config::default();

        // api_key may be empty if env var is not set
        assert!(!config.llm.api_base_url.is_empty());
        assert!(!config.llm.model.is_empty());
        assert_eq!(config.llm.max_tokens, 8192);
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.llm.timeout_seconds, 300);
    }

    #[test]
    fn test_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("perspect.toml");

        let content = r#"
verbose = true
output_path = "./reports"

[llm]
model = "test-model"
max_tokens = 2048

[pipeline]
max_parallel_agents = 2
run_timeout_seconds = 120

[store]
retain_hours = 24
"#;
        fs::write(&config_path, content).unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert!(config.verbose);
        assert_eq!(config.output_path, PathBuf::from("./reports"));
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.pipeline.max_parallel_agents, 2);
        assert_eq!(config.pipeline.run_timeout_seconds, Some(120));
        assert_eq!(config.store.retain_hours, 24);
        // 未指定的字段落在默认值
        assert_eq!(config.pipeline.max_research_fanout, 5);
    }

    #[test]
    fn test_config_from_missing_file() {
        let path = PathBuf::from("/nonexistent/perspect.toml");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_config_from_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "this is [not toml").unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }
}
