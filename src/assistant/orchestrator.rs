//! Chat orchestrator: the request facade of the assistant
//!
//! Resolves the conversation key, loads history, resolves a knowledge
//! context (client-supplied or built by the graph), routes generation and
//! records both turns.

use crate::assistant::history::ConversationHistory;
use crate::assistant::offline::EMPTY_MESSAGE_REPLY;
use crate::assistant::router::{GenerateRequest, ProviderRouter, OFFLINE_LABEL};
use crate::assistant::types::{
    ChatRequest, ChatResponse, ChatTurn, ResearchQuestionRequest, ResearchQuestionResponse,
};
use crate::knowledge::{ConversationTurn, KnowledgeContext, KnowledgeGraph, Role};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

const ANONYMOUS_KEY: &str = "anonymous";
const RESEARCH_SUMMARY_CHARS: usize = 200;

/// Reply when a research question is empty after trimming
pub const EMPTY_RESEARCH_REPLY: &str =
    "I didn’t receive a clear research question. Try asking what confuses you most about this artifact.";

pub struct ChatOrchestrator {
    router: Arc<ProviderRouter>,
    graph: Arc<KnowledgeGraph>,
    history: ConversationHistory,
}

impl ChatOrchestrator {
    pub fn new(router: Arc<ProviderRouter>, graph: Arc<KnowledgeGraph>, history_limit: usize) -> Self {
        Self {
            router,
            graph,
            history: ConversationHistory::new(history_limit),
        }
    }

    /// Conversation key: explicit conversation id, then user id, then anonymous
    pub fn conversation_key(request: &ChatRequest) -> String {
        request
            .conversation_id
            .as_deref()
            .or(request.user_id.as_deref())
            .unwrap_or(ANONYMOUS_KEY)
            .to_string()
    }

    /// Copy of the stored turns for a conversation key
    pub async fn history(&self, key: &str) -> Vec<ChatTurn> {
        self.history.snapshot(key).await
    }

    pub async fn handle_chat(&self, request: ChatRequest) -> ChatResponse {
        let key = Self::conversation_key(&request);
        let message = request.message.trim();
        if message.is_empty() {
            return ChatResponse {
                response: EMPTY_MESSAGE_REPLY.to_string(),
                provider: OFFLINE_LABEL.to_string(),
                context: KnowledgeContext::default(),
                recommendations: Vec::new(),
                timestamp: Utc::now(),
                conversation_key: key,
            };
        }

        let slot = self.history.slot(&key).await;
        let mut turns = slot.lock().await;

        let supplied = request
            .context
            .clone()
            .and_then(|ctx| ctx.into_knowledge_context());
        let context = match supplied {
            Some(ctx) => ctx,
            None => {
                self.graph
                    .build_context(message, request.user_id.as_deref(), Some(&key))
                    .await
            }
        };

        let reply = self
            .router
            .generate(GenerateRequest {
                message,
                history: turns.as_slice(),
                context: &context,
                mode: request.mode.provider_mode(),
                rapid: request.rapid,
                user: request.user_id.as_deref(),
            })
            .await;

        let now = Utc::now();
        let user_turn = ChatTurn {
            role: Role::User,
            content: message.to_string(),
            timestamp: now,
        };
        let assistant_turn = ChatTurn {
            role: Role::Assistant,
            content: reply.text.clone(),
            timestamp: now,
        };
        self.history
            .append_bounded(&mut *turns, [user_turn.clone(), assistant_turn.clone()]);

        for turn in [user_turn, assistant_turn] {
            let mut metadata = HashMap::new();
            metadata.insert("provider".to_string(), reply.provider.clone().into());
            self.graph
                .append_turn(
                    &key,
                    ConversationTurn {
                        role: turn.role,
                        content: turn.content,
                        timestamp: turn.timestamp,
                        metadata,
                    },
                )
                .await;
        }
        drop(turns);

        tracing::info!(
            conversation = %key,
            provider = %reply.provider,
            nodes = context.nodes.len(),
            "Chat turn handled"
        );

        let recommendations = context
            .recommendations
            .iter()
            .map(|r| r.action.clone())
            .filter(|a| !a.is_empty())
            .collect();

        ChatResponse {
            response: reply.text,
            provider: reply.provider,
            context,
            recommendations,
            timestamp: now,
            conversation_key: key,
        }
    }

    /// Answer a question about one artifact. Stateless: no history is read
    /// or written.
    pub async fn handle_research_question(&self, request: ResearchQuestionRequest) -> ResearchQuestionResponse {
        let message = request.message.trim();
        if message.is_empty() {
            return ResearchQuestionResponse {
                reply: EMPTY_RESEARCH_REPLY.to_string(),
                provider: OFFLINE_LABEL.to_string(),
                timestamp: Utc::now(),
            };
        }

        let excerpt: String = message.chars().take(RESEARCH_SUMMARY_CHARS).collect();
        let context = KnowledgeContext {
            context_summary: format!("User asked about artifact #{}: {}", request.artifact_id, excerpt),
            ..Default::default()
        };

        let reply = self
            .router
            .generate(GenerateRequest {
                message,
                history: &[],
                context: &context,
                mode: request.mode.provider_mode(),
                rapid: request.rapid,
                user: request.user_id.as_deref(),
            })
            .await;

        tracing::info!(
            artifact = %request.artifact_id,
            provider = %reply.provider,
            "Research question handled"
        );

        ResearchQuestionResponse {
            reply: reply.text,
            provider: reply.provider,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::offline::OfflineResponder;
    use crate::assistant::types::{ClientContext, ClientMode, ProviderMode};
    use crate::config::{KnowledgeConfig, ProvidersConfig};
    use crate::knowledge::{NodeKind, NodeSource};

    fn orchestrator() -> ChatOrchestrator {
        let router = ProviderRouter::new(
            Vec::new(),
            OfflineResponder::new().unwrap(),
            &ProvidersConfig::default(),
            ProviderMode::Hybrid,
        );
        let graph = KnowledgeGraph::new(None, KnowledgeConfig::default());
        ChatOrchestrator::new(Arc::new(router), Arc::new(graph), 20)
    }

    fn chat(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_message_leaves_history_untouched() {
        let o = orchestrator();
        let resp = o.handle_chat(chat("   ")).await;
        assert_eq!(resp.response, EMPTY_MESSAGE_REPLY);
        assert!(resp.context.is_empty());
        assert!(o.history("anonymous").await.is_empty());
    }

    #[tokio::test]
    async fn test_conversation_key_precedence() {
        let mut req = chat("x");
        assert_eq!(ChatOrchestrator::conversation_key(&req), "anonymous");
        req.user_id = Some("u1".to_string());
        assert_eq!(ChatOrchestrator::conversation_key(&req), "u1");
        req.conversation_id = Some("c1".to_string());
        assert_eq!(ChatOrchestrator::conversation_key(&req), "c1");
    }

    #[tokio::test]
    async fn test_history_capped_at_twenty() {
        let o = orchestrator();
        for i in 0..13 {
            o.handle_chat(chat(&format!("message number {}", i))).await;
        }
        let turns = o.history("anonymous").await;
        assert_eq!(turns.len(), 20);
        assert_eq!(turns[0].content, "message number 3");
        assert_eq!(turns[19].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_turns_share_timestamp_and_trimmed_content() {
        let o = orchestrator();
        let resp = o.handle_chat(chat("  hi there  ")).await;
        let turns = o.history("anonymous").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hi there");
        assert_eq!(turns[0].timestamp, turns[1].timestamp);
        assert_eq!(turns[1].content, resp.response);
        assert_eq!(resp.timestamp, turns[0].timestamp);
    }

    #[tokio::test]
    async fn test_built_context_and_recommendations() {
        let o = orchestrator();
        let resp = o.handle_chat(chat("what is the next step for my methodology")).await;
        assert!(!resp.context.nodes.is_empty());
        assert_eq!(resp.recommendations.len(), 1);
        assert!(resp.recommendations[0].contains("methodology"));
    }

    #[tokio::test]
    async fn test_supplied_context_is_used() {
        let o = orchestrator();
        let mut req = chat("hello");
        req.context = Some(ClientContext {
            context_summary: Some("Client summary".to_string()),
            ..Default::default()
        });
        let resp = o.handle_chat(req).await;
        assert_eq!(resp.context.context_summary, "Client summary");
        assert!(resp.context.nodes.is_empty());
        assert!(resp.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_turns_mirrored_into_graph() {
        let o = orchestrator();
        let mut req = chat("ethnography pilot went badly");
        req.conversation_id = Some("c1".to_string());
        o.handle_chat(req).await;

        let mut follow_up = chat("ethnography again");
        follow_up.conversation_id = Some("c1".to_string());
        let resp = o.handle_chat(follow_up).await;
        assert!(resp
            .context
            .nodes
            .iter()
            .any(|n| n.kind == NodeKind::Conversation && n.source == NodeSource::InMemory));
    }

    #[tokio::test]
    async fn test_concurrent_requests_on_one_key_serialize() {
        let o = Arc::new(orchestrator());
        let mut handles = Vec::new();
        for i in 0..8 {
            let o = o.clone();
            handles.push(tokio::spawn(async move {
                o.handle_chat(chat(&format!("concurrent message {}", i))).await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let turns = o.history("anonymous").await;
        assert_eq!(turns.len(), 16);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].timestamp, pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_offline_mode_label() {
        let o = orchestrator();
        let mut req = chat("tell me about theory");
        req.mode = ClientMode::Offline;
        let resp = o.handle_chat(req).await;
        assert_eq!(resp.provider, "offline");
    }

    #[tokio::test]
    async fn test_research_question_is_stateless() {
        let o = orchestrator();
        let resp = o
            .handle_research_question(ResearchQuestionRequest {
                artifact_id: "42".to_string(),
                message: "How does this memo relate to my gap?".to_string(),
                ..Default::default()
            })
            .await;
        assert!(resp.reply.ends_with("Compass · offline scholar mode"));
        assert_eq!(resp.provider, "offline");
        assert!(o.history("anonymous").await.is_empty());
        assert!(o.history("artifact:42").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_research_question() {
        let o = orchestrator();
        let resp = o
            .handle_research_question(ResearchQuestionRequest {
                artifact_id: "1".to_string(),
                message: " ".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(resp.reply, EMPTY_RESEARCH_REPLY);
    }
}
