//! Knowledge graph: persisted artifacts, the static catalog, and an
//! in-memory conversation ring buffer per conversation key.

use crate::config::KnowledgeConfig;
use crate::knowledge::catalog::static_nodes;
use crate::knowledge::scorer::{derive_context, score_nodes};
use crate::knowledge::types::{
    ConversationTurn, KnowledgeContext, KnowledgeNode, NodeKind, NodeSource, QueryOptions,
};
use crate::store::{ArtifactRow, KnowledgeStore};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

const CONVERSATION_SUMMARY_CHARS: usize = 200;

/// Retrieval facade built once at startup and shared by the request path
pub struct KnowledgeGraph {
    store: Option<Arc<dyn KnowledgeStore>>,
    config: KnowledgeConfig,
    conversations: RwLock<HashMap<String, VecDeque<KnowledgeNode>>>,
    seq: AtomicU64,
}

impl KnowledgeGraph {
    pub fn new(store: Option<Arc<dyn KnowledgeStore>>, config: KnowledgeConfig) -> Self {
        Self {
            store,
            config,
            conversations: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Window options from configuration
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions {
            limit: self.config.limit,
            min_relevance: self.config.min_relevance,
        }
    }

    /// Recent persisted artifacts as nodes; store failures yield nothing
    pub async fn fetch_persisted_nodes(&self, owner: Option<&str>) -> Vec<KnowledgeNode> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.recent_artifacts(owner, self.config.max_persisted).await {
            Ok(rows) => rows.into_iter().map(artifact_node).collect(),
            Err(e) => {
                tracing::warn!(store = store.name(), error = %e, "Failed to fetch persisted artifacts");
                Vec::new()
            }
        }
    }

    /// Mirror a conversation turn into the ring buffer for `key`
    pub async fn append_turn(&self, key: &str, turn: ConversationTurn) -> KnowledgeNode {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let role = turn.role.as_str();
        let summary: String = turn.content.chars().take(CONVERSATION_SUMMARY_CHARS).collect();

        let mut metadata = turn.metadata;
        metadata.insert("role".to_string(), role.into());
        metadata.insert("conversationKey".to_string(), key.into());

        let node = KnowledgeNode {
            id: format!("conv-{}-{}-{}", key, turn.timestamp.timestamp_millis(), seq),
            kind: NodeKind::Conversation,
            title: format!("Conversation ({})", role),
            summary,
            content: Some(turn.content),
            tags: vec!["conversation".to_string(), role.to_string(), key.to_lowercase()],
            source: NodeSource::InMemory,
            created_at: Some(turn.timestamp),
            score: None,
            metadata,
        };

        let mut conversations = self.conversations.write().await;
        let buffer = conversations.entry(key.to_string()).or_default();
        buffer.push_back(node.clone());
        while buffer.len() > self.config.conversation_capacity {
            buffer.pop_front();
        }
        node
    }

    /// The most recent `limit` turns for `key`, oldest first
    pub async fn recent_turns(&self, key: &str, limit: usize) -> Vec<KnowledgeNode> {
        let conversations = self.conversations.read().await;
        match conversations.get(key) {
            Some(buffer) => {
                let skip = buffer.len().saturating_sub(limit);
                buffer.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Build a context with the configured window
    pub async fn build_context(
        &self,
        query: &str,
        owner: Option<&str>,
        conversation_key: Option<&str>,
    ) -> KnowledgeContext {
        let options = self.default_options();
        self.build_context_with(query, owner, conversation_key, &options)
            .await
    }

    /// Merge persisted, static and recent conversation nodes, score them
    /// against `query` and derive the context bundle.
    pub async fn build_context_with(
        &self,
        query: &str,
        owner: Option<&str>,
        conversation_key: Option<&str>,
        options: &QueryOptions,
    ) -> KnowledgeContext {
        let query = query.trim();
        if query.is_empty() {
            return KnowledgeContext::default();
        }

        let mut nodes = self.fetch_persisted_nodes(owner).await;
        nodes.extend(static_nodes());
        if let Some(key) = conversation_key {
            nodes.extend(self.recent_turns(key, self.config.conversation_nodes).await);
        }

        let ranked = score_nodes(&nodes, query);
        let context = derive_context(ranked, query, options);
        tracing::debug!(
            candidates = nodes.len(),
            kept = context.nodes.len(),
            "Knowledge context built"
        );
        context
    }
}

fn artifact_node(row: ArtifactRow) -> KnowledgeNode {
    KnowledgeNode {
        id: row.id.to_string(),
        kind: NodeKind::Artifact,
        title: row.title,
        summary: row.description,
        content: None,
        tags: vec![row.artifact_type.to_lowercase()],
        source: NodeSource::PersistedStore,
        created_at: row.created_at,
        score: None,
        metadata: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::Role;
    use crate::store::testing::FailingStore;
    use crate::store::{FileStore, NewArtifact};
    use chrono::Utc;
    use tempfile::TempDir;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_ring_buffer_caps_capacity() {
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        for i in 0..55 {
            graph.append_turn("k", turn(Role::User, &format!("turn {}", i))).await;
        }
        let all = graph.recent_turns("k", 100).await;
        assert_eq!(all.len(), 50);
        assert_eq!(all[0].content.as_deref(), Some("turn 5"));
        assert_eq!(all[49].content.as_deref(), Some("turn 54"));

        let recent = graph.recent_turns("k", 2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content.as_deref(), Some("turn 54"));
    }

    #[tokio::test]
    async fn test_conversation_node_shape() {
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        let long = "x".repeat(300);
        let node = graph.append_turn("User-1", turn(Role::Assistant, &long)).await;

        assert_eq!(node.kind, NodeKind::Conversation);
        assert_eq!(node.source, NodeSource::InMemory);
        assert_eq!(node.summary.chars().count(), 200);
        assert_eq!(node.content.as_deref(), Some(long.as_str()));
        assert_eq!(node.tags, vec!["conversation", "assistant", "user-1"]);
        assert_eq!(node.metadata["conversationKey"], "User-1");
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        graph.append_turn("a", turn(Role::User, "hello")).await;
        assert!(graph.recent_turns("b", 6).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_store_yields_static_nodes_only() {
        let graph = KnowledgeGraph::new(Some(Arc::new(FailingStore)), KnowledgeConfig::default());
        assert!(graph.fetch_persisted_nodes(None).await.is_empty());

        let ctx = graph.build_context("compass", None, None).await;
        assert_eq!(ctx.nodes.len(), 5);
        assert!(ctx.nodes.iter().all(|n| n.source == NodeSource::StaticCatalog));
    }

    #[tokio::test]
    async fn test_empty_query_short_circuits() {
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        assert!(graph.build_context("   ", None, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_persisted_artifact_ranks_first() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        store
            .insert_artifact(NewArtifact {
                artifact_type: "Memo".to_string(),
                title: "Sampling frame".to_string(),
                description: "Who to interview for the pilot".to_string(),
                user_id: None,
            })
            .await
            .unwrap();

        let graph = KnowledgeGraph::new(Some(Arc::new(store)), KnowledgeConfig::default());
        let ctx = graph.build_context("sampling pilot", None, None).await;

        assert_eq!(ctx.nodes[0].title, "Sampling frame");
        assert_eq!(ctx.nodes[0].tags, vec!["memo"]);
        assert_eq!(ctx.artifacts[0].id, "1");
    }

    #[tokio::test]
    async fn test_conversation_nodes_join_context() {
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        graph
            .append_turn("k", turn(Role::User, "my ethnography pilot went badly"))
            .await;

        let ctx = graph.build_context("ethnography", None, Some("k")).await;
        assert_eq!(ctx.nodes[0].kind, NodeKind::Conversation);

        let other = graph.build_context("ethnography", None, Some("other")).await;
        assert!(other.nodes.iter().all(|n| n.kind != NodeKind::Conversation));
    }
}
