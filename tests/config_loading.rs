use std::io::Write;

use codeloom_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[model]
provider = "anthropic"
model_id = "claude-sonnet-4-20250514"
api_key = "sk-test-key"
max_tokens = 4096
temperature = 0.5
request_timeout_secs = 45

[flow]
max_retries = 5
interactive = true
approval_timeout_secs = 120
max_concurrent_requests = 2

[checkpoint]
enabled = true
path = "/tmp/codeloom-test/checkpoints.db"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.provider, "anthropic");
    assert_eq!(config.model.model_id, "claude-sonnet-4-20250514");
    assert_eq!(config.model.api_key, Some("sk-test-key".to_string()));
    assert_eq!(config.model.max_tokens, 4096);
    assert_eq!(config.model.request_timeout_secs, 45);

    assert_eq!(config.flow.max_retries, 5);
    assert!(config.flow.interactive);
    assert_eq!(config.flow.approval_timeout_secs, 120);
    assert_eq!(config.flow.max_concurrent_requests, 2);

    assert!(config.checkpoint.enabled);
    assert_eq!(
        config.checkpoint.path.as_deref(),
        Some("/tmp/codeloom-test/checkpoints.db")
    );
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("CODELOOM_TEST_API_KEY", "expanded-key-value");

    let toml_content = r#"
[model]
model_id = "test-model"
api_key = "${CODELOOM_TEST_API_KEY}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("CODELOOM_TEST_API_KEY");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[model]
model_id = "llama3.2"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.model_id, "llama3.2");
    assert_eq!(config.model.provider, "openai");
    assert_eq!(config.model.max_tokens, 2000);
    assert_eq!(config.flow.max_retries, 3);
    assert!(!config.flow.interactive);
    assert!(config.checkpoint.enabled);
    assert!(config.checkpoint.path.is_none());
}

#[test]
fn test_missing_config_file_is_config_not_found() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/codeloom.toml")).unwrap_err();
    assert!(matches!(
        err,
        codeloom_core::error::CodeloomError::ConfigNotFound(_)
    ));
}
