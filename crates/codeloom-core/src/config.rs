use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodeloomError, Result};

/// Top-level Codeloom configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-request timeout for the generation service.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_provider() -> String { "openai".to_string() }
fn default_model_id() -> String { "gpt-4o".to_string() }
fn default_max_tokens() -> u32 { 2000 }
fn default_temperature() -> f32 { 0.1 }
fn default_request_timeout() -> u64 { 30 }

/// Workflow engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Maximum traversals of the review→generation retry edge per run.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Pause at the approval gate for an operator decision.
    #[serde(default)]
    pub interactive: bool,
    /// Seconds to wait for an approval decision before rejecting.
    #[serde(default = "default_approval_timeout")]
    pub approval_timeout_secs: u64,
    /// Cap on concurrent in-flight generation requests across all runs.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            interactive: false,
            approval_timeout_secs: default_approval_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_approval_timeout() -> u64 { 60 }
fn default_max_concurrent() -> usize { 4 }

/// Checkpoint / resume configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_enabled")]
    pub enabled: bool,
    /// Path to the checkpoint database. Default: ~/.codeloom/checkpoints.db
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

fn default_checkpoint_enabled() -> bool { true }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| CodeloomError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| CodeloomError::Config(e.to_string()))
    }

    /// Apply environment-derived overrides.
    ///
    /// `CODELOOM_MODEL` overrides the model id, `CODELOOM_INTERACTIVE=1`
    /// turns on the approval gate, and `CODELOOM_API_KEY` (or the
    /// provider's conventional variable) fills a missing API key.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("CODELOOM_MODEL") {
            if !model.is_empty() {
                self.model.model_id = model;
            }
        }

        if let Ok(flag) = std::env::var("CODELOOM_INTERACTIVE") {
            if flag == "1" || flag.eq_ignore_ascii_case("true") {
                self.flow.interactive = true;
            }
        }

        if self.model.api_key.is_none() {
            self.model.api_key = std::env::var("CODELOOM_API_KEY")
                .ok()
                .or_else(|| match self.model.provider.as_str() {
                    "anthropic" | "claude" => std::env::var("ANTHROPIC_API_KEY").ok(),
                    _ => std::env::var("OPENAI_API_KEY").ok(),
                })
                .filter(|k| !k.is_empty());
        }
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_CODELOOM_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_CODELOOM_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_CODELOOM_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_CODELOOM_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_CODELOOM_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.model_id, "gpt-4o");
        assert_eq!(config.model.max_tokens, 2000);
        assert_eq!(config.flow.max_retries, 3);
        assert!(!config.flow.interactive);
        assert_eq!(config.flow.approval_timeout_secs, 60);
        assert_eq!(config.flow.max_concurrent_requests, 4);
        assert!(config.checkpoint.enabled);
        assert!(config.checkpoint.path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml_str = r#"
[model]
provider = "anthropic"
model_id = "claude-sonnet-4-20250514"

[flow]
max_retries = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.provider, "anthropic");
        assert_eq!(config.model.temperature, 0.1);
        assert_eq!(config.flow.max_retries, 5);
        assert_eq!(config.flow.approval_timeout_secs, 60);
    }

    #[test]
    fn test_env_override_model_and_interactive() {
        std::env::set_var("CODELOOM_MODEL", "gpt-4o-mini");
        std::env::set_var("CODELOOM_INTERACTIVE", "1");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.model.model_id, "gpt-4o-mini");
        assert!(config.flow.interactive);

        std::env::remove_var("CODELOOM_MODEL");
        std::env::remove_var("CODELOOM_INTERACTIVE");
    }

    #[test]
    fn test_env_override_never_clobbers_explicit_key() {
        std::env::set_var("CODELOOM_API_KEY", "env-key");

        let mut config = AppConfig::default();
        config.model.api_key = Some("file-key".to_string());
        config.apply_env_overrides();
        assert_eq!(config.model.api_key.as_deref(), Some("file-key"));

        std::env::remove_var("CODELOOM_API_KEY");
    }
}
