//! HTTP handler for the Compass summary
//!
//! - POST /api/compass/summary: latest Compass snapshot for a page

use crate::compass::types::{CompassSummaryRequest, CompassSummaryResponse};
use crate::compass::{fallback_compass_state, merge_row};
use crate::store::KnowledgeStore;
use axum::{body::Bytes, extract::State, response::IntoResponse, routing::post, Json, Router};
use std::sync::Arc;

const DEFAULT_PATH: &str = "/";
const DEFAULT_SOURCE: &str = "global-assistant";

const NOTE_NO_STORE: &str = "Knowledge store not configured; serving fallback Compass state.";
const NOTE_STORE_ERROR: &str = "Knowledge store unavailable; serving fallback Compass state.";
const NOTE_NO_ROW: &str = "No Compass object found; serving fallback Compass state.";

/// Shared state for the Compass handler
#[derive(Clone)]
pub struct CompassApiState {
    pub store: Option<Arc<dyn KnowledgeStore>>,
}

/// Create the Compass router
pub fn compass_router(state: CompassApiState) -> Router {
    Router::new()
        .route("/api/compass/summary", post(summary))
        .with_state(state)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// POST /api/compass/summary
///
/// Any body, including a malformed one, is accepted; missing fields take
/// their defaults.
async fn summary(State(state): State<CompassApiState>, body: Bytes) -> impl IntoResponse {
    let request: CompassSummaryRequest = serde_json::from_slice(&body).unwrap_or_default();
    let path = non_empty(request.path).unwrap_or_else(|| DEFAULT_PATH.to_string());
    let source = non_empty(request.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    let user_id = non_empty(request.user_id);

    let path_filter = (path != DEFAULT_PATH).then_some(path.as_str());

    let (compass, note) = match &state.store {
        None => (fallback_compass_state(), Some(NOTE_NO_STORE)),
        Some(store) => match store.latest_compass(user_id.as_deref(), path_filter).await {
            Ok(Some(row)) => (merge_row(row), None),
            Ok(None) => (fallback_compass_state(), Some(NOTE_NO_ROW)),
            Err(e) => {
                tracing::warn!(store = store.name(), error = %e, "Compass lookup failed");
                (fallback_compass_state(), Some(NOTE_STORE_ERROR))
            }
        },
    };

    tracing::debug!(path = %path, source = %source, fallback = note.is_some(), "Compass summary served");

    Json(CompassSummaryResponse {
        path,
        source,
        compass,
        note: note.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FailingStore;
    use crate::store::{CompassRow, FileStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn post_summary(app: Router, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/compass/summary")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_store_failure_serves_fallback() {
        let app = compass_router(CompassApiState {
            store: Some(Arc::new(FailingStore)),
        });
        let (status, json) = post_summary(app, "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["path"], "/");
        assert_eq!(json["source"], "global-assistant");
        assert_eq!(json["compass"]["overallAlignment"], 50.0);
        assert_eq!(json["compass"]["researchDrift"], 25.0);
        assert_eq!(json["compass"]["weeklyMomentum"], 0.0);
        assert!(json["note"].is_string());
    }

    #[tokio::test]
    async fn test_missing_store_serves_fallback() {
        let app = compass_router(CompassApiState { store: None });
        let (status, json) = post_summary(app, "not json at all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["note"], NOTE_NO_STORE);
    }

    #[tokio::test]
    async fn test_stored_row_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).await.unwrap();
        store
            .put_compass(CompassRow {
                user_id: Some("u1".to_string()),
                path: Some("/dashboard".to_string()),
                overall_alignment: Some(81.0),
                next_best_action: Some("Draft the gap paragraph.".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let store: Arc<dyn KnowledgeStore> = Arc::new(store);

        let app = compass_router(CompassApiState {
            store: Some(store.clone()),
        });
        let (_, json) = post_summary(
            app,
            r#"{"path": "/dashboard", "source": "sidebar", "userId": "u1"}"#,
        )
        .await;
        assert_eq!(json["path"], "/dashboard");
        assert_eq!(json["source"], "sidebar");
        assert_eq!(json["compass"]["overallAlignment"], 81.0);
        assert_eq!(json["compass"]["researchDrift"], 25.0);
        assert_eq!(json["compass"]["nextBestAction"], "Draft the gap paragraph.");
        assert!(json.get("note").is_none());

        // Root path applies no path filter
        let app = compass_router(CompassApiState {
            store: Some(store.clone()),
        });
        let (_, json) = post_summary(app, r#"{"userId": "u1"}"#).await;
        assert_eq!(json["compass"]["overallAlignment"], 81.0);

        let app = compass_router(CompassApiState { store: Some(store) });
        let (_, json) = post_summary(app, r#"{"path": "/other", "userId": "u1"}"#).await;
        assert_eq!(json["note"], NOTE_NO_ROW);
    }
}
