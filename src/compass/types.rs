//! Compass wire types
//!
//! The four-quadrant snapshot the dashboard visualizes. All types use
//! camelCase JSON serialization to match the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quadrant identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuadrantId {
    Problem,
    Gap,
    Contribution,
    Alignment,
}

/// A single Compass quadrant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadrantData {
    pub id: QuadrantId,
    pub title: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    /// 0..=100
    pub progress: f64,
    /// 0..=100
    pub clarity: f64,
    /// -100..=100
    pub momentum: f64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

/// The four quadrants, keyed by name on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quadrants {
    pub problem: QuadrantData,
    pub gap: QuadrantData,
    pub contribution: QuadrantData,
    pub alignment: QuadrantData,
}

/// Aggregate Compass snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompassState {
    pub quadrants: Quadrants,
    /// 0..=100
    pub overall_alignment: f64,
    /// 0..=100, 0 = perfectly aligned
    pub research_drift: f64,
    /// -100..=100
    pub weekly_momentum: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_best_action: Option<String>,
    pub ai_insights: Vec<String>,
}

/// Request body for the Compass summary endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompassSummaryRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Response body for the Compass summary endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompassSummaryResponse {
    pub path: String,
    pub source: String,
    pub compass: CompassState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
