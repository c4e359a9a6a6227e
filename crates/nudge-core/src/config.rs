use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::NudgeError;

/// Top-level configuration.
///
/// Loaded from a TOML file and passed explicitly into every component
/// constructor — nothing reads ambient process state directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Owner user id — every persisted record is scoped to it. A run
    /// with no owner configured fails with an auth error before any
    /// external call.
    #[serde(default)]
    pub owner_user_id: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default message fetch size for `analyze`.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner_user_id: String::new(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

/// OpenAI-compatible classifier/generator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

/// Slack chat platform config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlackConfig {
    #[serde(default)]
    pub bot_token: String,
}

/// Gmail (read-only) config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GmailConfig {
    #[serde(default)]
    pub access_token: String,
}

/// Persistent store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_data_dir() -> String {
    "~/.nudge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fetch_limit() -> u32 {
    30
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_db_path() -> String {
    "~/.nudge/nudge.db".to_string()
}

/// Expand a leading `~` to the user's home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/{rest}");
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, NudgeError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config {
            engine: EngineConfig::default(),
            classifier: ClassifierConfig::default(),
            slack: SlackConfig::default(),
            gmail: GmailConfig::default(),
            memory: MemoryConfig::default(),
        });
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| NudgeError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| NudgeError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClassifierConfig::default();
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert!(cfg.api_key.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [engine]
            owner_user_id = "u-1"
            fetch_limit = 50

            [classifier]
            api_key = "sk-test"

            [slack]
            bot_token = "xoxb-test"
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.engine.owner_user_id, "u-1");
        assert_eq!(cfg.engine.fetch_limit, 50);
        assert_eq!(cfg.engine.log_level, "info");
        assert_eq!(cfg.classifier.api_key, "sk-test");
        assert_eq!(cfg.slack.bot_token, "xoxb-test");
        assert_eq!(cfg.memory.db_path, "~/.nudge/nudge.db");
    }
}
