//! Assistant request/response types

use crate::config::DefaultMode;
use crate::knowledge::{KnowledgeContext, Recommendation, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the router combines cloud and offline generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Online,
    Offline,
    Hybrid,
}

impl ProviderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Hybrid => "hybrid",
        }
    }
}

impl From<DefaultMode> for ProviderMode {
    fn from(mode: DefaultMode) -> Self {
        match mode {
            DefaultMode::Online => Self::Online,
            DefaultMode::Offline => Self::Offline,
            DefaultMode::Hybrid => Self::Hybrid,
        }
    }
}

/// Mode as requested by a client; `Auto` defers to the router default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientMode {
    #[default]
    Auto,
    Online,
    Offline,
    Hybrid,
}

impl ClientMode {
    /// Parse a client-supplied mode; unknown values mean `Auto`
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("online") => Self::Online,
            Some("offline") => Self::Offline,
            Some("hybrid") => Self::Hybrid,
            _ => Self::Auto,
        }
    }

    pub fn provider_mode(&self) -> Option<ProviderMode> {
        match self {
            Self::Auto => None,
            Self::Online => Some(ProviderMode::Online),
            Self::Offline => Some(ProviderMode::Offline),
            Self::Hybrid => Some(ProviderMode::Hybrid),
        }
    }
}

/// One entry of a conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Knowledge fields a client may send along with a message
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    #[serde(default)]
    pub knowledge_context: Option<KnowledgeContext>,
    #[serde(default)]
    pub context_summary: Option<String>,
    #[serde(default)]
    pub insights: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Option<Vec<Recommendation>>,
}

impl ClientContext {
    /// The supplied knowledge, if the client sent any knowledge field
    pub fn into_knowledge_context(self) -> Option<KnowledgeContext> {
        if let Some(ctx) = self.knowledge_context {
            return Some(ctx);
        }
        if self.context_summary.is_none() && self.insights.is_none() && self.recommendations.is_none() {
            return None;
        }
        Some(KnowledgeContext {
            context_summary: self.context_summary.unwrap_or_default(),
            insights: self.insights.unwrap_or_default(),
            recommendations: self.recommendations.unwrap_or_default(),
            ..Default::default()
        })
    }
}

/// A chat turn submitted to the orchestrator
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
    pub context: Option<ClientContext>,
    pub mode: ClientMode,
    pub rapid: bool,
}

/// Orchestrator reply for one chat turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    /// `offline`, a provider id, or `hybrid:<provider id>`
    pub provider: String,
    pub context: KnowledgeContext,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub conversation_key: String,
}

/// A question about one artifact
#[derive(Debug, Clone, Default)]
pub struct ResearchQuestionRequest {
    pub artifact_id: String,
    pub message: String,
    pub user_id: Option<String>,
    pub mode: ClientMode,
    pub rapid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchQuestionResponse {
    pub reply: String,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}
