//! Persisted row shapes
//!
//! Rows use the storage column names (snake_case), independent of the
//! camelCase wire format of the HTTP API.

use crate::compass::types::Quadrants;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artifact identifier: numeric for SQL-backed stores, text otherwise
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A persisted research artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub id: ArtifactId,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Insert payload for a new artifact
#[derive(Debug, Clone, Serialize)]
pub struct NewArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A persisted Compass object; any column may be null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompassRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub quadrants: Option<Quadrants>,
    #[serde(default)]
    pub overall_alignment: Option<f64>,
    #[serde(default)]
    pub research_drift: Option<f64>,
    #[serde(default)]
    pub weekly_momentum: Option<f64>,
    #[serde(default)]
    pub next_best_action: Option<String>,
    #[serde(default)]
    pub ai_insights: Option<Vec<String>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
