//! Compass summary
//!
//! Serves the latest persisted Compass object for an owner and page path.
//! Missing rows, missing stores and store failures all degrade to a constant
//! fallback snapshot, which is never written back.

pub mod handler;
pub mod types;

pub use handler::{compass_router, CompassApiState};
pub use types::{CompassState, QuadrantData, QuadrantId, Quadrants};

use crate::store::CompassRow;

const FALLBACK_OVERALL_ALIGNMENT: f64 = 50.0;
const FALLBACK_RESEARCH_DRIFT: f64 = 25.0;
const FALLBACK_WEEKLY_MOMENTUM: f64 = 0.0;
const FALLBACK_NEXT_ACTION: &str = "Start by clarifying your problem statement.";

fn default_quadrant(id: QuadrantId, title: &str, description: &str, color: &str, icon: &str) -> QuadrantData {
    QuadrantData {
        id,
        title: title.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        icon: icon.to_string(),
        progress: 50.0,
        clarity: 50.0,
        momentum: 0.0,
        last_updated: None,
        insights: Vec::new(),
        risks: Vec::new(),
    }
}

fn fallback_quadrants() -> Quadrants {
    Quadrants {
        problem: default_quadrant(
            QuadrantId::Problem,
            "Problem Space",
            "What problem are you really solving?",
            "#3b82f6",
            "🎯",
        ),
        gap: default_quadrant(
            QuadrantId::Gap,
            "Knowledge Gap",
            "What is missing in the existing literature?",
            "#10b981",
            "🧩",
        ),
        contribution: default_quadrant(
            QuadrantId::Contribution,
            "Your Contribution",
            "What novel value are you adding?",
            "#8b5cf6",
            "✨",
        ),
        alignment: default_quadrant(
            QuadrantId::Alignment,
            "Research Alignment",
            "How well do your actions match your goals?",
            "#f59e0b",
            "🧭",
        ),
    }
}

fn fallback_insights() -> Vec<String> {
    vec![
        "Complete a Compass object to track your doctoral progress.".to_string(),
        "Connect your daily work to your contribution statement.".to_string(),
    ]
}

/// Constant snapshot served when no Compass object is available
pub fn fallback_compass_state() -> CompassState {
    CompassState {
        quadrants: fallback_quadrants(),
        overall_alignment: FALLBACK_OVERALL_ALIGNMENT,
        research_drift: FALLBACK_RESEARCH_DRIFT,
        weekly_momentum: FALLBACK_WEEKLY_MOMENTUM,
        next_best_action: Some(FALLBACK_NEXT_ACTION.to_string()),
        ai_insights: fallback_insights(),
    }
}

/// Finite value clamped into range, or the fallback
fn metric(value: Option<f64>, fallback: f64, min: f64, max: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(min, max),
        _ => fallback,
    }
}

/// Build a snapshot from a stored row; null columns fall back one by one
pub fn merge_row(row: CompassRow) -> CompassState {
    CompassState {
        quadrants: row.quadrants.unwrap_or_else(fallback_quadrants),
        overall_alignment: metric(row.overall_alignment, FALLBACK_OVERALL_ALIGNMENT, 0.0, 100.0),
        research_drift: metric(row.research_drift, FALLBACK_RESEARCH_DRIFT, 0.0, 100.0),
        weekly_momentum: metric(row.weekly_momentum, FALLBACK_WEEKLY_MOMENTUM, -100.0, 100.0),
        next_best_action: row
            .next_best_action
            .or_else(|| Some(FALLBACK_NEXT_ACTION.to_string())),
        ai_insights: row.ai_insights.unwrap_or_else(fallback_insights),
    }
}
