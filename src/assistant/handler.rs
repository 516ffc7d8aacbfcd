//! HTTP handlers for the assistant API
//!
//! - POST /api/ai/chat: one chat turn, JSON or SSE (`stream: true`)
//! - POST /api/ai/research: question about a single artifact
//! - GET  /api/ai/providers: configured cloud providers and default mode

use crate::assistant::orchestrator::ChatOrchestrator;
use crate::assistant::router::ProviderRouter;
use crate::assistant::stream::{response_events, StreamEvent};
use crate::assistant::types::{ChatRequest, ClientContext, ClientMode, ResearchQuestionRequest};
use crate::error::{to_json, ApiError};
use crate::knowledge::KnowledgeContext;
use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;

/// Shared state for assistant handlers
#[derive(Clone)]
pub struct AssistantState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub router: Arc<ProviderRouter>,
    /// Maximum characters per streamed token event
    pub chunk_size: usize,
}

/// Create the assistant router
pub fn assistant_router(state: AssistantState) -> Router {
    Router::new()
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/research", post(research))
        .route("/api/ai/providers", get(providers))
        .with_state(state)
}

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    conversation_id: Option<Value>,
    #[serde(default)]
    mode: Option<Value>,
    #[serde(default)]
    context: Option<Value>,
    #[serde(default)]
    stream: Option<Value>,
    #[serde(default)]
    rapid: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResearchBody {
    #[serde(default)]
    artifact_id: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    mode: Option<Value>,
    #[serde(default)]
    rapid: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatReply {
    response: String,
    /// Same text as `response`, kept for older clients
    reply: String,
    provider: String,
    timestamp: DateTime<Utc>,
    recommendations: Vec<String>,
    context: KnowledgeContext,
    conversation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvidersReply {
    providers: Vec<String>,
    default_mode: &'static str,
}

/// Non-empty string value, ignoring any other JSON type
fn non_empty_str(value: &Option<Value>) -> Option<String> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn mode_of(value: &Option<Value>) -> ClientMode {
    ClientMode::parse_lenient(value.as_ref().and_then(Value::as_str))
}

fn flag(value: &Option<Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// Decode one client context field; a mistyped field is dropped on its own
fn context_field<T: serde::de::DeserializeOwned>(
    fields: &mut serde_json::Map<String, Value>,
    name: &str,
) -> Option<T> {
    let value = fields.remove(name).filter(|v| !v.is_null())?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(field = name, error = %e, "Ignoring malformed client context field");
            None
        }
    }
}

/// Knowledge fields of a client context object; anything unusable is ignored
fn client_context(value: Option<Value>) -> Option<ClientContext> {
    let Some(Value::Object(mut fields)) = value else {
        return None;
    };
    Some(ClientContext {
        knowledge_context: context_field(&mut fields, "knowledgeContext"),
        context_summary: context_field(&mut fields, "contextSummary"),
        insights: context_field(&mut fields, "insights"),
        recommendations: context_field(&mut fields, "recommendations"),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/ai/chat
async fn chat(State(state): State<AssistantState>, body: Bytes) -> Response {
    let Ok(body) = serde_json::from_slice::<ChatBody>(&body) else {
        return ApiError::bad_request("message is required.").into_response();
    };
    let Some(message) = body.message.as_ref().and_then(Value::as_str) else {
        return ApiError::bad_request("message is required.").into_response();
    };
    let message = message.trim().to_string();
    if message.is_empty() {
        return ApiError::bad_request("message cannot be empty.").into_response();
    }

    let request = ChatRequest {
        message,
        user_id: non_empty_str(&body.user_id),
        conversation_id: non_empty_str(&body.conversation_id),
        context: client_context(body.context),
        mode: mode_of(&body.mode),
        rapid: flag(&body.rapid),
    };
    let response = state.orchestrator.handle_chat(request).await;

    if flag(&body.stream) {
        return sse_response(response_events(&response, state.chunk_size)).into_response();
    }

    Json(ChatReply {
        reply: response.response.clone(),
        response: response.response,
        provider: response.provider,
        timestamp: response.timestamp,
        recommendations: response.recommendations,
        context: response.context,
        conversation_id: response.conversation_key,
    })
    .into_response()
}

/// POST /api/ai/research
async fn research(State(state): State<AssistantState>, body: Bytes) -> Response {
    const REQUIRED: &str = "artifactId and message are required.";

    let Ok(body) = serde_json::from_slice::<ResearchBody>(&body) else {
        return ApiError::bad_request(REQUIRED).into_response();
    };
    let artifact_id = match &body.artifact_id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return ApiError::bad_request(REQUIRED).into_response(),
    };
    let Some(message) = body.message.as_ref().and_then(Value::as_str) else {
        return ApiError::bad_request(REQUIRED).into_response();
    };
    let message = message.trim().to_string();
    if message.is_empty() {
        return ApiError::bad_request("message cannot be empty.").into_response();
    }

    let response = state
        .orchestrator
        .handle_research_question(ResearchQuestionRequest {
            artifact_id,
            message,
            user_id: non_empty_str(&body.user_id),
            mode: mode_of(&body.mode),
            rapid: flag(&body.rapid),
        })
        .await;

    Json(to_json(response)).into_response()
}

/// GET /api/ai/providers
async fn providers(State(state): State<AssistantState>) -> impl IntoResponse {
    Json(ProvidersReply {
        providers: state.router.provider_names(),
        default_mode: state.router.default_mode().as_str(),
    })
}

// =============================================================================
// Streaming
// =============================================================================

/// Logs at debug level if the client goes away before `done` was sent
struct StreamGuard {
    finished: bool,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("Chat stream cancelled by client");
        }
    }
}

fn sse_response(
    events: Vec<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    use async_stream::stream;
    let stream = stream! {
        let mut guard = StreamGuard { finished: false };
        for event in events {
            yield Ok(Event::default().json_data(&event).unwrap_or_else(|_| Event::default().data("{}")));
        }
        guard.finished = true;
    };
    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::offline::OfflineResponder;
    use crate::assistant::types::ProviderMode;
    use crate::config::{KnowledgeConfig, ProvidersConfig};
    use crate::knowledge::KnowledgeGraph;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_app() -> Router {
        let router = Arc::new(ProviderRouter::new(
            Vec::new(),
            OfflineResponder::new().unwrap(),
            &ProvidersConfig::default(),
            ProviderMode::Hybrid,
        ));
        let graph = Arc::new(KnowledgeGraph::new(None, KnowledgeConfig::default()));
        let orchestrator = Arc::new(ChatOrchestrator::new(router.clone(), graph, 20));
        assistant_router(AssistantState {
            orchestrator,
            router,
            chunk_size: 40,
        })
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_greeting_gets_welcome_voice() {
        let resp = post_json(make_app(), "/api/ai/chat", r#"{"message": "hi there"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let text = json["response"].as_str().unwrap();
        assert!(text.contains("Welcome · offline scholar mode"));
        assert_eq!(json["reply"], json["response"]);
        assert_eq!(json["provider"], "offline");
        assert_eq!(json["conversationId"], "anonymous");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_missing_message() {
        let resp = post_json(make_app(), "/api/ai/chat", r#"{"userId": "u1"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "message is required.");

        let resp = post_json(make_app(), "/api/ai/chat", r#"{"message": 42}"#).await;
        assert_eq!(body_json(resp).await["error"], "message is required.");

        let resp = post_json(make_app(), "/api/ai/chat", "not json").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_message_with_stream_is_rejected_before_streaming() {
        let resp = post_json(make_app(), "/api/ai/chat", r#"{"message": "", "stream": true}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"));
        assert_eq!(body_json(resp).await["error"], "message cannot be empty.");
    }

    #[tokio::test]
    async fn test_streaming_events() {
        let resp = post_json(
            make_app(),
            "/api/ai/chat",
            r#"{"message": "tell me about theory", "stream": true, "mode": "offline"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .starts_with("text/event-stream"));

        let body = axum::body::to_bytes(resp.into_body(), 1024 * 256).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        let events: Vec<Value> = text
            .split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect();

        assert_eq!(events.first().unwrap()["type"], "start");
        let done = events.last().unwrap();
        assert_eq!(done["type"], "done");
        assert_eq!(done["provider"], "offline");

        let deltas: Vec<&str> = events
            .iter()
            .filter(|e| e["type"] == "token")
            .map(|e| e["delta"].as_str().unwrap())
            .collect();
        assert!(deltas.len() > 1);
        assert!(deltas.iter().all(|d| d.chars().count() <= 40 || !d.contains(' ')));
        let full: Vec<&str> = done["fullText"].as_str().unwrap().split_whitespace().collect();
        assert_eq!(deltas.join(" "), full.join(" "));
    }

    #[tokio::test]
    async fn test_unknown_mode_is_auto() {
        let resp = post_json(
            make_app(),
            "/api/ai/chat",
            r#"{"message": "tell me about theory", "mode": "turbo"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        // No providers configured: hybrid default degrades to offline
        assert_eq!(body_json(resp).await["provider"], "offline");
    }

    #[test]
    fn test_client_context_fields_decode_independently() {
        let ctx = client_context(Some(serde_json::json!({
            "contextSummary": "Stored summary",
            "insights": "not a list",
            "recommendations": [{"action": "Read one paper", "priority": "low", "reasoning": "r"}]
        })))
        .unwrap();
        assert_eq!(ctx.context_summary.as_deref(), Some("Stored summary"));
        assert!(ctx.insights.is_none());
        assert_eq!(ctx.recommendations.unwrap().len(), 1);

        assert!(client_context(Some(Value::String("x".to_string()))).is_none());
    }

    #[tokio::test]
    async fn test_mistyped_context_field_keeps_the_rest() {
        let resp = post_json(
            make_app(),
            "/api/ai/chat",
            r#"{"message": "hello", "context": {"contextSummary": "Client summary", "insights": "oops"}}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["context"]["contextSummary"], "Client summary");
        assert_eq!(json["context"]["nodes"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_research_validation() {
        let resp = post_json(make_app(), "/api/ai/research", r#"{"message": "what?"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "artifactId and message are required.");

        let resp = post_json(make_app(), "/api/ai/research", r#"{"artifactId": null, "message": "x"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_research_numeric_artifact_id() {
        let resp = post_json(
            make_app(),
            "/api/ai/research",
            r#"{"artifactId": 7, "message": "Is this memo about my gap?", "mode": "offline"}"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["reply"].as_str().unwrap().contains("Compass · offline scholar mode"));
        assert_eq!(json["provider"], "offline");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_providers_endpoint() {
        let resp = make_app()
            .oneshot(
                Request::builder()
                    .uri("/api/ai/providers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["providers"].as_array().unwrap().len(), 0);
        assert_eq!(json["defaultMode"], "hybrid");
    }
}
