#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(&["perspect-rs"]).unwrap();

        assert_eq!(args.claim, None);
        assert_eq!(args.resume, None);
        assert_eq!(args.output_path, PathBuf::from("./perspect.reports"));
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_claim_positional() {
        let args =
            Args::try_parse_from(&["perspect-rs", "The moon is made of cheese", "-v"]).unwrap();

        assert_eq!(args.claim, Some("The moon is made of cheese".to_string()));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_resume_option() {
        let args = Args::try_parse_from(&["perspect-rs", "--resume", "run-abc123"]).unwrap();

        assert_eq!(args.resume, Some("run-abc123".to_string()));
        assert_eq!(args.claim, None);
    }

    #[test]
    fn test_args_llm_options() {
        let args = Args::try_parse_from(&[
            "perspect-rs",
            "some claim",
            "--llm-api-key",
            "test-key",
            "--llm-api-base-url",
            "https://api.example.com/v1",
            "--model",
            "test-model",
            "--max-tokens",
            "2048",
            "--temperature",
            "0.7",
        ])
        .unwrap();

        assert_eq!(args.llm_api_key, Some("test-key".to_string()));
        assert_eq!(
            args.llm_api_base_url,
            Some("https://api.example.com/v1".to_string())
        );
        assert_eq!(args.model, Some("test-model".to_string()));
        assert_eq!(args.max_tokens, Some(2048));
        assert_eq!(args.temperature, Some(0.7));
    }

    #[test]
    fn test_args_pipeline_options() {
        let args = Args::try_parse_from(&[
            "perspect-rs",
            "some claim",
            "--max-parallels",
            "3",
            "--max-fanout",
            "4",
            "--step-timeout",
            "60",
            "--run-timeout",
            "600",
        ])
        .unwrap();

        assert_eq!(args.max_parallels, Some(3));
        assert_eq!(args.max_fanout, Some(4));
        assert_eq!(args.step_timeout, Some(60));
        assert_eq!(args.run_timeout, Some(600));
    }

    #[test]
    fn test_into_config_applies_overrides() {
        let args = Args::try_parse_from(&[
            "perspect-rs",
            "some claim",
            "-o",
            "/tmp/reports",
            "--llm-api-key",
            "override-key",
            "--max-parallels",
            "2",
            "--max-fanout",
            "3",
            "--run-timeout",
            "120",
            "-v",
        ])
        .unwrap();

        let config = args.into_config();

        assert_eq!(config.output_path, PathBuf::from("/tmp/reports"));
        assert_eq!(config.llm.api_key, "override-key");
        assert_eq!(config.pipeline.max_parallel_agents, 2);
        assert_eq!(config.pipeline.max_research_fanout, 3);
        assert_eq!(config.pipeline.run_timeout_seconds, Some(120));
        assert!(config.verbose);
    }

    #[test]
    fn test_into_config_keeps_defaults_without_overrides() {
        let args = Args::try_parse_from(&["perspect-rs", "some claim"]).unwrap();
        let config = args.into_config();

        assert_eq!(config.pipeline.max_parallel_agents, 5);
        assert_eq!(config.pipeline.max_research_fanout, 5);
        assert_eq!(config.pipeline.run_timeout_seconds, None);
        assert_eq!(config.store.retain_hours, 72);
    }
}
