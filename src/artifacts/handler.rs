//! HTTP handler for artifact intake
//!
//! - POST /api/artifacts: validate and persist one artifact

use crate::error::ApiError;
use crate::store::{ArtifactId, KnowledgeStore, NewArtifact};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Shared state for the artifacts handler
#[derive(Clone)]
pub struct ArtifactsState {
    pub store: Option<Arc<dyn KnowledgeStore>>,
}

/// Create the artifacts router
pub fn artifacts_router(state: ArtifactsState) -> Router {
    Router::new()
        .route("/api/artifacts", post(create_artifact))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArtifactBody {
    #[serde(default, rename = "type")]
    artifact_type: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    user_id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CreatedArtifact {
    id: ArtifactId,
}

fn required(value: &Option<Value>) -> Option<String> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// POST /api/artifacts
async fn create_artifact(State(state): State<ArtifactsState>, body: Bytes) -> Response {
    const REQUIRED: &str = "type, title, and description are required";

    let Ok(body) = serde_json::from_slice::<CreateArtifactBody>(&body) else {
        return ApiError::bad_request(REQUIRED).into_response();
    };
    let (Some(artifact_type), Some(title), Some(description)) = (
        required(&body.artifact_type),
        required(&body.title),
        required(&body.description),
    ) else {
        return ApiError::bad_request(REQUIRED).into_response();
    };

    let Some(store) = &state.store else {
        tracing::error!("Artifact rejected: no knowledge store configured");
        return ApiError::internal("Server configuration error.").into_response();
    };

    let artifact = NewArtifact {
        artifact_type,
        title,
        description,
        user_id: required(&body.user_id),
    };
    match store.insert_artifact(artifact).await {
        Ok(id) => {
            tracing::info!(id = %id, store = store.name(), "Artifact created");
            (StatusCode::CREATED, Json(CreatedArtifact { id })).into_response()
        }
        Err(e) => {
            tracing::error!(store = store.name(), error = %e, "Artifact insert failed");
            ApiError::internal("Failed to create artifact.").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FailingStore;
    use crate::store::FileStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_artifact(app: Router, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/artifacts")
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
    async fn test_create_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KnowledgeStore> = Arc::new(FileStore::new(dir.path()).await.unwrap());
        let app = artifacts_router(ArtifactsState {
            store: Some(store.clone()),
        });

        let (status, json) = post_artifact(
            app,
            r#"{"type": "memo", "title": "Ethnography pilot", "description": "Pilot notes", "userId": "u1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["id"], 1);

        let rows = store.recent_artifacts(Some("u1"), 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Ethnography pilot");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let app = artifacts_router(ArtifactsState { store: None });
        let (status, json) = post_artifact(app.clone(), r#"{"type": "memo", "title": "x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "type, title, and description are required");

        let (status, _) =
            post_artifact(app.clone(), r#"{"type": "memo", "title": "  ", "description": "d"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_artifact(app, "[]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_store_failure() {
        let app = artifacts_router(ArtifactsState {
            store: Some(Arc::new(FailingStore)),
        });
        let (status, json) =
            post_artifact(app, r#"{"type": "memo", "title": "t", "description": "d"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to create artifact.");
    }

    #[tokio::test]
    async fn test_missing_store() {
        let app = artifacts_router(ArtifactsState { store: None });
        let (status, json) =
            post_artifact(app, r#"{"type": "memo", "title": "t", "description": "d"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Server configuration error.");
    }
}
