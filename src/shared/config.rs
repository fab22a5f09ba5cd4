//! Application configuration. Model paths, severity strategy, LLM credentials.
//!
//! Read from `TRIAGE_*` environment variables (and `.env`), optionally layered
//! over a file named by `TRIAGE_CONFIG`.

use crate::domain::{DEFAULT_LABEL_MAP, SeverityTier};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default request body limit. Base64 images are ~4/3 of their binary size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Default tokenizer truncation length for the text severity model.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// How severity is attached to a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityStrategy {
    /// Look the image label up in the severity table.
    #[default]
    Table,
    /// Classify the user's message with the text model.
    TextModel,
}

impl FromStr for SeverityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "table" | "csv" => Ok(Self::Table),
            "text_model" | "text" | "bert" => Ok(Self::TextModel),
            other => Err(format!("unknown severity strategy '{}'", other)),
        }
    }
}

impl fmt::Display for SeverityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::TextModel => f.write_str("text_model"),
        }
    }
}

/// Hosted narrative model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenAi,
    Mock,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "ollama" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Bind host. Read from TRIAGE_HOST.
    #[serde(default)]
    pub host: Option<String>,

    /// Bind port. Read from TRIAGE_PORT.
    #[serde(default)]
    pub port: Option<u16>,

    /// Max request body in bytes. Read from TRIAGE_MAX_BODY_BYTES.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,

    /// Comma-separated CORS origins; empty allows any. Read from TRIAGE_CORS_ALLOWED_ORIGINS.
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Severity
    // ─────────────────────────────────────────────────────────────────────────
    /// "table" or "text_model". Read from TRIAGE_SEVERITY_STRATEGY.
    #[serde(default)]
    pub severity_strategy: Option<String>,

    /// Severity CSV (Condition,Severity). Read from TRIAGE_SEVERITY_CSV.
    #[serde(default)]
    pub severity_csv: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Models
    // ─────────────────────────────────────────────────────────────────────────
    /// ViT checkpoint directory. Read from TRIAGE_VIT_MODEL_DIR.
    #[serde(default)]
    pub vit_model_dir: Option<String>,

    /// Labeled image folder whose class names form the label vocabulary.
    /// Read from TRIAGE_VIT_LABELS_DIR. Unset: use id2label from config.json.
    #[serde(default)]
    pub vit_labels_dir: Option<String>,

    /// BERT checkpoint directory. Read from TRIAGE_BERT_MODEL_DIR.
    #[serde(default)]
    pub bert_model_dir: Option<String>,

    /// Comma-separated tiers by class index, e.g. "High,Low,Medium". Read from TRIAGE_BERT_LABEL_MAP.
    #[serde(default)]
    pub bert_label_map: Option<String>,

    /// Tokenizer truncation length. Read from TRIAGE_BERT_MAX_LENGTH.
    #[serde(default)]
    pub bert_max_length: Option<usize>,

    // ─────────────────────────────────────────────────────────────────────────
    // Narrative generation
    // ─────────────────────────────────────────────────────────────────────────
    /// "gemini", "openai" or "mock". Read from TRIAGE_LLM_PROVIDER.
    #[serde(default)]
    pub llm_provider: Option<String>,

    /// API key. Read from TRIAGE_LLM_API_KEY.
    #[serde(default)]
    pub llm_api_key: Option<String>,

    /// API base URL (Gemini) or chat-completions endpoint (OpenAI). Read from TRIAGE_LLM_API_URL.
    #[serde(default)]
    pub llm_api_url: Option<String>,

    /// Model identifier. Read from TRIAGE_LLM_MODEL.
    #[serde(default)]
    pub llm_model: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("TRIAGE_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("TRIAGE"));
        c.build()?.try_deserialize()
    }

    /// Returns the bind address. Defaults to 0.0.0.0:5000.
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or("0.0.0.0"),
            self.port.unwrap_or(5000)
        )
    }

    pub fn max_body_bytes_or_default(&self) -> usize {
        self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }

    /// CORS allow-list. Empty means any origin.
    pub fn cors_origins(&self) -> Vec<String> {
        split_list(self.cors_allowed_origins.as_deref())
    }

    /// Returns the severity strategy. Defaults to table lookup.
    pub fn severity_strategy(&self) -> Result<SeverityStrategy, String> {
        self.severity_strategy
            .as_deref()
            .map(str::parse)
            .unwrap_or(Ok(SeverityStrategy::default()))
    }

    pub fn severity_csv_path(&self) -> Option<PathBuf> {
        self.severity_csv.as_deref().map(PathBuf::from)
    }

    /// Returns the ViT checkpoint directory. Defaults to ./models/vit.
    pub fn vit_model_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.vit_model_dir.as_deref().unwrap_or("./models/vit"))
    }

    pub fn vit_labels_dir(&self) -> Option<PathBuf> {
        self.vit_labels_dir.as_deref().map(PathBuf::from)
    }

    /// Returns the BERT checkpoint directory. Defaults to ./models/bert.
    pub fn bert_model_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.bert_model_dir.as_deref().unwrap_or("./models/bert"))
    }

    /// Returns the class-index -> tier map. Defaults to High, Low, Medium.
    pub fn bert_label_map(&self) -> Result<Vec<SeverityTier>, String> {
        let names = split_list(self.bert_label_map.as_deref());
        if names.is_empty() {
            return Ok(DEFAULT_LABEL_MAP.to_vec());
        }
        names
            .iter()
            .map(|name| match SeverityTier::parse(name) {
                SeverityTier::Unknown => Err(format!("unknown tier '{}' in label map", name)),
                tier => Ok(tier),
            })
            .collect()
    }

    pub fn bert_max_length_or_default(&self) -> usize {
        self.bert_max_length.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // LLM Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the LLM API key if configured and non-empty.
    pub fn llm_api_key(&self) -> Option<String> {
        self.llm_api_key.clone().filter(|k| !k.trim().is_empty())
    }

    /// Returns the provider. Falls back to the mock when no API key is set,
    /// except for an OpenAI-compatible endpoint given explicitly (e.g. local Ollama).
    pub fn llm_provider(&self) -> Result<LlmProvider, String> {
        let provider = self
            .llm_provider
            .as_deref()
            .map(str::parse)
            .unwrap_or(Ok(LlmProvider::default()))?;
        let keyless_endpoint = provider == LlmProvider::OpenAi && self.llm_api_url().is_some();
        if provider != LlmProvider::Mock && self.llm_api_key().is_none() && !keyless_endpoint {
            return Ok(LlmProvider::Mock);
        }
        Ok(provider)
    }

    pub fn llm_api_url(&self) -> Option<String> {
        self.llm_api_url.clone().filter(|u| !u.trim().is_empty())
    }

    pub fn llm_model(&self) -> Option<String> {
        self.llm_model.clone()
    }

    /// Returns true if a hosted LLM is configured (API key present).
    pub fn is_llm_configured(&self) -> bool {
        self.llm_api_key().is_some()
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
        assert_eq!(cfg.severity_strategy().unwrap(), SeverityStrategy::Table);
        assert_eq!(cfg.bert_label_map().unwrap(), DEFAULT_LABEL_MAP.to_vec());
        assert_eq!(cfg.max_body_bytes_or_default(), DEFAULT_MAX_BODY_BYTES);
        assert!(cfg.cors_origins().is_empty());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("TEXT-MODEL".parse(), Ok(SeverityStrategy::TextModel));
        assert_eq!(" table ".parse(), Ok(SeverityStrategy::Table));
        assert!("both".parse::<SeverityStrategy>().is_err());
    }

    #[test]
    fn test_label_map_parsing() {
        let cfg = AppConfig {
            bert_label_map: Some("low, medium ,HIGH".to_string()),
            ..Default::default()
        };
        assert_eq!(
            cfg.bert_label_map().unwrap(),
            vec![SeverityTier::Low, SeverityTier::Medium, SeverityTier::High]
        );

        let cfg = AppConfig {
            bert_label_map: Some("Low,Severe".to_string()),
            ..Default::default()
        };
        assert!(cfg.bert_label_map().is_err());
    }

    #[test]
    fn test_llm_provider_falls_back_to_mock_without_key() {
        let cfg = AppConfig {
            llm_provider: Some("gemini".to_string()),
            llm_api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.llm_provider().unwrap(), LlmProvider::Mock);

        let cfg = AppConfig {
            llm_provider: Some("openai".to_string()),
            llm_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.llm_provider().unwrap(), LlmProvider::OpenAi);
        assert!(cfg.is_llm_configured());
    }

    #[test]
    fn test_keyless_openai_endpoint_is_not_mocked() {
        let cfg = AppConfig {
            llm_provider: Some("ollama".to_string()),
            llm_api_url: Some("http://localhost:11434/v1/chat/completions".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.llm_provider().unwrap(), LlmProvider::OpenAi);
        assert!(!cfg.is_llm_configured());

        let cfg = AppConfig {
            llm_provider: Some("ollama".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.llm_provider().unwrap(), LlmProvider::Mock);

        let cfg = AppConfig {
            llm_provider: Some("gemini".to_string()),
            llm_api_url: Some("https://generativelanguage.googleapis.com/v1beta".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.llm_provider().unwrap(), LlmProvider::Mock);
    }

    #[test]
    fn test_cors_origins_split() {
        let cfg = AppConfig {
            cors_allowed_origins: Some("http://localhost:3000, https://triage.example".into()),
            ..Default::default()
        };
        assert_eq!(
            cfg.cors_origins(),
            vec!["http://localhost:3000", "https://triage.example"]
        );
    }
}
