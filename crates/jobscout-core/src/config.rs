use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{JobscoutError, Result};

/// Top-level configuration for the jobscout application.
///
/// Loaded from `~/.jobscout/config.toml` by default. Each section
/// corresponds to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobscoutConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub listings: ListingsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub drift: DriftConfig,
}

impl JobscoutConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: JobscoutConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if
    /// the file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| JobscoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.jobscout/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Vacancy listings API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingsConfig {
    /// Base URL of the listings API.
    pub base_url: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// How many vacancies to retrieve per search.
    pub max_results: u32,
    /// Recency window in days (the API caps this at 30).
    pub period_days: u32,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hh.ru".to_string(),
            request_timeout_secs: 30,
            max_results: 20,
            period_days: 30,
        }
    }
}

/// Completion service settings.
///
/// An empty key list disables every completion-backed feature; the
/// engine then runs on its local fallbacks only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    /// API keys; rotated to the next key on a rate-limit response.
    pub api_keys: Vec<String>,
    /// Model identifier.
    pub model: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        self.api_keys.iter().any(|k| !k.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_keys: Vec::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Chat engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Vacancies shown per result page.
    pub page_size: usize,
    /// Most-recent conversation turns passed as model context.
    pub context_turns: usize,
    /// Minimum relevance score (0-100) for the relevance filter.
    pub min_relevance: u8,
    /// Delivery-layer menu labels that bypass classification.
    pub menu_labels: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: 3,
            context_turns: 6,
            min_relevance: 50,
            menu_labels: vec![
                "🔍 Поиск работы".to_string(),
                "⭐ Избранное".to_string(),
                "📊 Статистика".to_string(),
                "❓ Помощь".to_string(),
                "◀️ Главное меню".to_string(),
                "🧠 Умный поиск".to_string(),
            ],
        }
    }
}

/// Off-topic drift guard thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Consecutive off-topic messages before a redirect.
    pub max_consecutive: u32,
    /// Cumulative off-topic messages before a full reset.
    pub max_total: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            max_consecutive: 3,
            max_total: 10,
        }
    }
}
