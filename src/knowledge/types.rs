//! Knowledge graph types
//!
//! All types use camelCase JSON serialization to match the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of a knowledge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Artifact,
    Doc,
    Compass,
    Ritual,
    System,
    Conversation,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Doc => "doc",
            Self::Compass => "compass",
            Self::Ritual => "ritual",
            Self::System => "system",
            Self::Conversation => "conversation",
        }
    }

    /// Upper-case label used in context summaries
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

/// Where a node came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeSource {
    PersistedStore,
    StaticCatalog,
    InMemory,
}

/// A unit of retrievable knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeNode {
    pub id: String,
    pub kind: NodeKind,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: NodeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Set by a scoring pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Compact artifact reference carried in a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A suggested next action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: String,
    pub priority: Priority,
    #[serde(default)]
    pub reasoning: String,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u32>,
}

/// Ranked nodes plus everything derived from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeContext {
    pub nodes: Vec<KnowledgeNode>,
    pub artifacts: Vec<ArtifactSummary>,
    pub context_summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

impl KnowledgeContext {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.artifacts.is_empty()
            && self.context_summary.is_empty()
            && self.insights.is_empty()
            && self.recommendations.is_empty()
    }
}

/// Retrieval window options
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub limit: usize,
    pub min_relevance: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_relevance: 0.0,
        }
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation turn to mirror into the graph
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}
