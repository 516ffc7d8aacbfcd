//! Relevance scoring and context derivation
//!
//! Scoring is a pure function of `(nodes, query, now)`: keyword hits over
//! title, summary and tags, plus a recency bonus for persisted nodes.
//! Everything in a [`KnowledgeContext`] besides `nodes` is derived from the
//! ranked window (and, for recommendations, from the query).

use crate::knowledge::types::{
    ArtifactSummary, KnowledgeContext, KnowledgeNode, NodeKind, NodeSource, Priority,
    QueryOptions, Recommendation,
};
use chrono::{DateTime, Utc};

/// Points per distinct query token found in a node
const TOKEN_HIT: f64 = 3.0;
/// Maximum recency bonus, awarded to a node created now
const RECENCY_MAX: f64 = 2.0;
/// Age at which the recency bonus reaches zero
const RECENCY_WINDOW_DAYS: f64 = 60.0;
const MIN_TOKEN_CHARS: usize = 3;
const MAX_CONTEXT_ARTIFACTS: usize = 5;
const SUMMARY_NODES: usize = 6;

/// Lowercase, split on whitespace and light punctuation, drop short tokens,
/// de-duplicate preserving first occurrence.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for raw in lowered.split(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '/' | '\\')
    }) {
        if raw.chars().count() < MIN_TOKEN_CHARS {
            continue;
        }
        if !tokens.iter().any(|t| t == raw) {
            tokens.push(raw.to_string());
        }
    }
    tokens
}

/// Recency bonus in `[0, 2]`, persisted nodes with a timestamp only
pub fn recency_bonus(node: &KnowledgeNode, now: DateTime<Utc>) -> f64 {
    if node.source != NodeSource::PersistedStore {
        return 0.0;
    }
    let Some(created_at) = node.created_at else {
        return 0.0;
    };
    let age_days = ((now - created_at).num_milliseconds() as f64 / 86_400_000.0).max(0.0);
    (1.0 - age_days / RECENCY_WINDOW_DAYS).max(0.0) * RECENCY_MAX
}

/// Score nodes against a query at a fixed instant.
///
/// Returns annotated copies sorted by descending score; ties keep their
/// input order.
pub fn score_nodes_at(nodes: &[KnowledgeNode], query: &str, now: DateTime<Utc>) -> Vec<KnowledgeNode> {
    let tokens = tokenize(query);
    let mut scored: Vec<KnowledgeNode> = nodes
        .iter()
        .map(|node| {
            let haystack = format!("{} {} {}", node.title, node.summary, node.tags.join(" "))
                .to_lowercase();
            let hits = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
            let mut scored = node.clone();
            scored.score = Some(hits as f64 * TOKEN_HIT + recency_bonus(node, now));
            scored
        })
        .collect();

    // Vec::sort_by is stable
    scored.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .total_cmp(&a.score.unwrap_or(0.0))
    });
    scored
}

/// Score nodes against a query using the wall clock
pub fn score_nodes(nodes: &[KnowledgeNode], query: &str) -> Vec<KnowledgeNode> {
    score_nodes_at(nodes, query, Utc::now())
}

/// Cut a ranked list to the retrieval window and derive the context bundle
pub fn derive_context(ranked: Vec<KnowledgeNode>, query: &str, options: &QueryOptions) -> KnowledgeContext {
    let top: Vec<KnowledgeNode> = ranked
        .into_iter()
        .filter(|n| n.score.unwrap_or(0.0) >= options.min_relevance)
        .take(options.limit)
        .collect();

    if top.is_empty() {
        return KnowledgeContext::default();
    }

    KnowledgeContext {
        artifacts: artifact_summaries(&top),
        context_summary: build_context_summary(&top),
        insights: build_insights(&top),
        recommendations: build_recommendations(&top, query),
        nodes: top,
    }
}

/// First artifact or doc nodes, as compact references
pub fn artifact_summaries(nodes: &[KnowledgeNode]) -> Vec<ArtifactSummary> {
    nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::Artifact | NodeKind::Doc))
        .take(MAX_CONTEXT_ARTIFACTS)
        .map(|n| ArtifactSummary {
            id: n.id.clone(),
            title: n.title.clone(),
            artifact_type: Some(n.kind.as_str().to_string()),
            description: Some(n.summary.clone()),
        })
        .collect()
}

pub fn build_context_summary(nodes: &[KnowledgeNode]) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    let mut lines = vec!["Condensed view of the most relevant items for this question:".to_string()];
    lines.extend(
        nodes
            .iter()
            .take(SUMMARY_NODES)
            .map(|n| format!("- [{}] {} — {}", n.kind.label(), n.title, n.summary)),
    );
    lines.join("\n")
}

pub fn build_insights(nodes: &[KnowledgeNode]) -> Vec<String> {
    let has_compass = nodes.iter().any(|n| n.kind == NodeKind::Compass);
    let has_artifacts = nodes.iter().any(|n| n.kind == NodeKind::Artifact);

    let mut insights = Vec::new();
    if has_compass && !has_artifacts {
        insights.push(
            "Your Compass is in place but no recent artifacts point back to it. Capture one note that ties today's work to the Compass."
                .to_string(),
        );
    }
    if has_artifacts && !has_compass {
        insights.push(
            "You have research artifacts, but the Compass is out of view. Sharpen your Problem, Gap and Contribution so the artifacts have a direction."
                .to_string(),
        );
    }
    if insights.is_empty() && !nodes.is_empty() {
        insights.push(
            "There is usable context here: recent artifacts and system notes can anchor the next step."
                .to_string(),
        );
    }
    insights
}

pub fn build_recommendations(nodes: &[KnowledgeNode], query: &str) -> Vec<Recommendation> {
    let q = query.to_lowercase();
    let methodological = ["methodology", "method", "next step", "stuck"]
        .iter()
        .any(|k| q.contains(k));

    let mut recommendations = Vec::new();
    if methodological {
        recommendations.push(Recommendation {
            action: "Choose one 30–60 minute task that moves your methodology forward and block time for it today."
                .to_string(),
            priority: Priority::High,
            reasoning: "A single concrete methodological step reduces uncertainty faster than more planning."
                .to_string(),
            estimated_time: Some(45),
        });
    }

    if nodes.iter().any(|n| n.kind == NodeKind::Artifact) {
        recommendations.push(Recommendation {
            action: "Review one recent artifact and link it explicitly to your Compass.".to_string(),
            priority: Priority::Medium,
            reasoning: "Linking artifacts to the Compass keeps the work cumulative instead of scattered."
                .to_string(),
            estimated_time: Some(20),
        });
    }

    if recommendations.is_empty() {
        recommendations.push(Recommendation {
            action: "Describe what currently feels most confusing in one or two sentences.".to_string(),
            priority: Priority::Low,
            reasoning: "Naming the confusion precisely makes the next step easier to see.".to_string(),
            estimated_time: None,
        });
    }
    recommendations
}
