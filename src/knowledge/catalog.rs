//! Built-in knowledge nodes describing the DCCF system itself

use crate::knowledge::types::{KnowledgeNode, NodeKind, NodeSource};
use std::collections::HashMap;

/// The five static catalog nodes, appended to every context build
pub fn static_nodes() -> Vec<KnowledgeNode> {
    vec![
        node(
            "compass-core",
            NodeKind::Compass,
            "DCCF Compass",
            "The Compass tracks Problem, Gap, Contribution and Alignment so daily work stays tied to the thesis contribution.",
            &["dccf", "compass", "contribution"],
        ),
        node(
            "rituals-daily",
            NodeKind::Ritual,
            "Daily research rituals",
            "Short daily rituals (a focused writing block, a reading block, a five-minute reflection) keep momentum without burnout.",
            &["dccf", "rituals", "habits"],
        ),
        node(
            "research-hub",
            NodeKind::Doc,
            "Research Hub",
            "The Research Hub collects artifacts such as notes, drafts and memos so they can be linked back to the Compass.",
            &["dccf", "research-hub"],
        ),
        node(
            "wins-log",
            NodeKind::System,
            "Wins log",
            "Logging small wins makes progress visible and counters the feeling that nothing is moving.",
            &["dccf", "wins"],
        ),
        node(
            "bottlenecks",
            NodeKind::Doc,
            "Common doctoral bottlenecks",
            "Typical blockers are a fuzzy problem statement, an unclear gap, methodology paralysis and isolation.",
            &["bottlenecks", "risk"],
        ),
    ]
}

fn node(id: &str, kind: NodeKind, title: &str, summary: &str, tags: &[&str]) -> KnowledgeNode {
    KnowledgeNode {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        summary: summary.to_string(),
        content: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        source: NodeSource::StaticCatalog,
        created_at: None,
        score: None,
        metadata: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let nodes = static_nodes();
        assert_eq!(nodes.len(), 5);
        assert!(nodes.iter().all(|n| n.source == NodeSource::StaticCatalog));
        assert!(nodes.iter().all(|n| n.created_at.is_none()));
        for n in &nodes {
            for tag in &n.tags {
                assert_eq!(tag, &tag.to_lowercase());
            }
        }
        let ids: std::collections::HashSet<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
    }
}
