//! Astrid configuration - v0.6.0
//!
//! Configuration lives in ~/.config/astrid/config.toml. Every field has a
//! default so a missing or partial file still yields a working setup. The
//! cloud API key ships as a placeholder; until the user replaces it the
//! cloud backend reports itself as not configured.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "astrid";
const CONFIG_FILE: &str = "config.toml";

/// Placeholder shipped in the default config. Counts as "no key".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstridConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub cloud: CloudSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Local inference settings (Ollama-style endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of the local inference server.
    #[serde(default = "default_local_endpoint")]
    pub endpoint: String,

    /// Default local model for chat and diagnosis.
    #[serde(default = "default_local_model")]
    pub local_model: String,

    /// Code-specialized local model used while in code mode.
    #[serde(default = "default_code_model")]
    pub code_model: String,

    /// Timeout for interactive chat queries (seconds).
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,

    /// Timeout for shell-failure diagnosis queries (seconds).
    /// Shorter than chat: a diagnosis should not stall the prompt.
    #[serde(default = "default_diag_timeout")]
    pub diag_timeout_secs: u64,
}

fn default_local_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_local_model() -> String {
    "mistral".to_string()
}

fn default_code_model() -> String {
    "qwen2.5-coder".to_string()
}

fn default_chat_timeout() -> u64 {
    90
}

fn default_diag_timeout() -> u64 {
    20
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_local_endpoint(),
            local_model: default_local_model(),
            code_model: default_code_model(),
            chat_timeout_secs: default_chat_timeout(),
            diag_timeout_secs: default_diag_timeout(),
        }
    }
}

/// Remote API settings (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudSettings {
    #[serde(default = "default_cloud_endpoint")]
    pub endpoint: String,

    /// Default cloud model used as fallback target.
    #[serde(default = "default_cloud_model")]
    pub model: String,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,
}

fn default_cloud_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_cloud_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key() -> String {
    PLACEHOLDER_API_KEY.to_string()
}

fn default_cloud_timeout() -> u64 {
    15
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            endpoint: default_cloud_endpoint(),
            model: default_cloud_model(),
            api_key: default_api_key(),
            timeout_secs: default_cloud_timeout(),
        }
    }
}

impl CloudSettings {
    /// An empty or placeholder key means the cloud backend is unavailable.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.contains(PLACEHOLDER_API_KEY)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AstridConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path. Missing file yields full defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults on any
    /// problem. A broken config file must not keep the shell from starting.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config at {}: {e:#}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AstridConfig::default();
        assert_eq!(config.llm.endpoint, "http://localhost:11434");
        assert_eq!(config.llm.local_model, "mistral");
        assert_eq!(config.cloud.model, "gpt-4o");
        assert_eq!(config.llm.chat_timeout_secs, 90);
        assert_eq!(config.llm.diag_timeout_secs, 20);
        assert!(config.llm.diag_timeout_secs < config.llm.chat_timeout_secs);
    }

    #[test]
    fn test_placeholder_key_is_not_configured() {
        let cloud = CloudSettings::default();
        assert!(!cloud.is_configured());

        let empty = CloudSettings {
            api_key: "   ".to_string(),
            ..Default::default()
        };
        assert!(!empty.is_configured());

        let real = CloudSettings {
            api_key: "sk-abc123".to_string(),
            ..Default::default()
        };
        assert!(real.is_configured());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let raw = r#"
[cloud]
api_key = "sk-test"
"#;
        let config: AstridConfig = toml::from_str(raw).unwrap();
        assert!(config.cloud.is_configured());
        assert_eq!(config.cloud.model, "gpt-4o");
        assert_eq!(config.llm.local_model, "mistral");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AstridConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.llm.local_model, "mistral");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\nlocal_model = \"llama3.2:3b\"\n").unwrap();

        let config = AstridConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.local_model, "llama3.2:3b");
        assert_eq!(config.llm.code_model, "qwen2.5-coder");
    }
}
