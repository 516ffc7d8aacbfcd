//! DCCF configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main DCCF configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DccfConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Cloud provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Retrieval and scoring configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Chat behaviour configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

impl DccfConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18795,
            cors_origins: Vec::new(),
        }
    }
}

/// Identifier of a cloud text-generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Preference order used in online and hybrid mode
    pub order: Vec<ProviderKind>,

    /// Per-call timeout in seconds; no retries
    pub timeout_secs: u64,

    /// Sampling temperature for every generative call
    pub temperature: f32,

    /// Reply budget in rapid mode
    pub rapid_max_tokens: u32,

    /// Reply budget in full mode
    pub full_max_tokens: u32,

    /// OpenAI chat completions
    pub openai: ProviderConfig,

    /// DeepSeek chat completions (OpenAI-compatible)
    pub deepseek: ProviderConfig,

    /// Google Gemini generateContent
    pub gemini: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: vec![ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Gemini],
            openai: ProviderConfig {
                api_key_ref: "openai_api_key".to_string(),
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            deepseek: ProviderConfig {
                api_key_ref: "deepseek_api_key".to_string(),
                api_key: None,
                base_url: "https://api.deepseek.com".to_string(),
                model: "deepseek-chat".to_string(),
            },
            gemini: ProviderConfig {
                api_key_ref: "gemini_api_key".to_string(),
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: "gemini-1.5-flash-latest".to_string(),
            },
            timeout_secs: 20,
            temperature: 0.4,
            rapid_max_tokens: 350,
            full_max_tokens: 700,
        }
    }
}

impl ProvidersConfig {
    /// Configuration for a provider kind
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::DeepSeek => &self.deepseek,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

/// Single provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    pub api_key_ref: String,

    /// Inline API key (takes precedence over the environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,
}

/// Resolve API keys for every configured provider.
///
/// An inline `api_key` wins. Otherwise `api_key_ref` names an environment
/// variable (e.g. `"openai_api_key"` reads `$OPENAI_API_KEY`); both the
/// original casing and the UPPER_CASE form are tried. Blank values count as
/// missing.
pub fn resolve_api_keys_from_env(providers: &ProvidersConfig) -> HashMap<ProviderKind, String> {
    let mut keys = HashMap::new();
    for kind in [ProviderKind::OpenAi, ProviderKind::DeepSeek, ProviderKind::Gemini] {
        let cfg = providers.get(kind);
        let val = cfg.api_key.clone().filter(|k| !k.trim().is_empty()).or_else(|| {
            std::env::var(&cfg.api_key_ref)
                .or_else(|_| std::env::var(cfg.api_key_ref.to_uppercase()))
                .ok()
                .filter(|k| !k.trim().is_empty())
        });
        if let Some(key) = val {
            keys.insert(kind, key);
        }
    }
    keys
}

/// Knowledge store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// JSON documents on the local filesystem
    #[default]
    File,

    /// PostgREST-compatible HTTP tables
    Rest,
}

/// Knowledge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,

    /// Data directory for the file backend
    pub data_dir: PathBuf,

    /// Base URL of the REST backend (e.g. `https://xyz.supabase.co`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,

    /// Environment variable holding the REST API key
    pub rest_key_ref: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            data_dir: default_data_dir(),
            rest_url: None,
            rest_key_ref: "supabase_anon_key".to_string(),
        }
    }
}

impl StoreConfig {
    /// Resolve the REST API key from the environment
    pub fn rest_key(&self) -> Option<String> {
        std::env::var(&self.rest_key_ref)
            .or_else(|_| std::env::var(self.rest_key_ref.to_uppercase()))
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Default data directory (~/.dccf/data)
fn default_data_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dccf")
        .join("data")
}

/// Retrieval and scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Number of ranked nodes kept in a context
    pub limit: usize,

    /// Minimum score for a node to be kept
    pub min_relevance: f64,

    /// Maximum persisted artifacts fetched per context build
    pub max_persisted: usize,

    /// Conversation nodes kept in memory per conversation key
    pub conversation_capacity: usize,

    /// Recent conversation nodes mixed into a context build
    pub conversation_nodes: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            min_relevance: 0.0,
            max_persisted: 50,
            conversation_capacity: 50,
            conversation_nodes: 6,
        }
    }
}

/// Default provider mode when a request does not name one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultMode {
    Online,
    Offline,
    #[default]
    Hybrid,
}

/// Chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Turns kept per conversation key
    pub history_limit: usize,

    /// Maximum characters per streamed token event
    pub chunk_size: usize,

    /// Mode used when the client sends none (or "auto")
    pub default_mode: DefaultMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            chunk_size: 400,
            default_mode: DefaultMode::Hybrid,
        }
    }
}
