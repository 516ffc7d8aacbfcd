//! Unified API router for DCCF
//!
//! Merges all module routers into a single axum `Router` with CORS,
//! request tracing and a catch-all 500 response.
//!
//! ## Endpoint Map
//!
//! | Route                      | Module    | Description                      |
//! |----------------------------|-----------|----------------------------------|
//! | `GET /health`              | api       | Liveness probe                   |
//! | `POST /api/ai/chat`        | assistant | Chat turn, JSON or SSE           |
//! | `POST /api/ai/research`    | assistant | Question about one artifact      |
//! | `GET /api/ai/providers`    | assistant | Configured cloud providers       |
//! | `POST /api/compass/summary`| compass   | Latest Compass snapshot          |
//! | `POST /api/artifacts`      | artifacts | Artifact intake                  |

use crate::artifacts::{artifacts_router, ArtifactsState};
use crate::assistant::{assistant_router, AssistantState};
use crate::compass::{compass_router, CompassApiState};
use crate::error::ApiError;
use axum::{
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete DCCF HTTP application
///
/// Merges all module routers, adds middleware, and returns a single
/// `Router` ready to be served by `axum::serve`.
pub fn build_app(
    assistant_state: AssistantState,
    compass_state: CompassApiState,
    artifacts_state: ArtifactsState,
    cors_origins: &[String],
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Module routers (each defines its own /api/... prefixed routes)
        .merge(assistant_router(assistant_state))
        .merge(compass_router(compass_state))
        .merge(artifacts_router(artifacts_state))
        .layer(CatchPanicLayer::custom(unexpected_error))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

// =============================================================================
// Root handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Panics inside a handler become a generic 500; details only go to the log
fn unexpected_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "Handler panicked");
    ApiError::internal("Unexpected server error.").into_response()
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(cors::Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::{ChatOrchestrator, OfflineResponder, ProviderMode, ProviderRouter};
    use crate::config::{KnowledgeConfig, ProvidersConfig};
    use crate::knowledge::KnowledgeGraph;
    use crate::store::{FileStore, KnowledgeStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_app(store: Option<Arc<dyn KnowledgeStore>>) -> Router {
        let router = Arc::new(ProviderRouter::new(
            Vec::new(),
            OfflineResponder::new().unwrap(),
            &ProvidersConfig::default(),
            ProviderMode::Hybrid,
        ));
        let graph = Arc::new(KnowledgeGraph::new(store.clone(), KnowledgeConfig::default()));
        let orchestrator = Arc::new(ChatOrchestrator::new(router.clone(), graph, 20));
        build_app(
            AssistantState {
                orchestrator,
                router,
                chunk_size: 400,
            },
            CompassApiState {
                store: store.clone(),
            },
            ArtifactsState { store },
            &[],
        )
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, json) = send(&make_app(None), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_created_artifact_reaches_chat_context() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KnowledgeStore> = Arc::new(FileStore::new(dir.path()).await.unwrap());
        let app = make_app(Some(store));

        let (status, json) = send(
            &app,
            "POST",
            "/api/artifacts",
            Some(r#"{"type": "memo", "title": "Ethnography pilot", "description": "Field notes from the first site visit"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(json["id"].is_number());

        let (status, json) = send(
            &app,
            "POST",
            "/api/ai/chat",
            Some(r#"{"message": "what did the ethnography pilot show?"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let nodes = json["context"]["nodes"].as_array().unwrap();
        assert!(nodes
            .iter()
            .any(|n| n["kind"] == "artifact" && n["title"] == "Ethnography pilot"));
    }

    #[tokio::test]
    async fn test_compass_without_store() {
        let (status, json) = send(&make_app(None), "POST", "/api/compass/summary", Some("{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["compass"]["overallAlignment"], 50.0);
        assert!(json["note"].is_string());
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let app = Router::new()
            .route(
                "/boom",
                get(|| async {
                    if true {
                        panic!("boom");
                    }
                }),
            )
            .layer(CatchPanicLayer::custom(unexpected_error));
        let (status, json) = send(&app, "GET", "/boom", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Unexpected server error.");
    }

    #[test]
    fn test_release_profile_unwinds() {
        // CatchPanicLayer needs unwinding; an aborting release build would
        // kill the server instead of answering 500.
        let manifest: toml::Value = toml::from_str(include_str!("../Cargo.toml")).unwrap();
        let panic = manifest
            .get("profile")
            .and_then(|p| p.get("release"))
            .and_then(|r| r.get("panic"))
            .and_then(toml::Value::as_str);
        assert_ne!(panic, Some("abort"));
    }

    #[test]
    fn test_build_cors_with_origins() {
        let _cors = build_cors(&[
            "http://localhost:3000".to_string(),
            "https://dccf.example.com".to_string(),
        ]);
    }
}
