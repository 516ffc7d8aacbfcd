//! Service wiring and HTTP server lifecycle

use crate::api::build_app;
use crate::artifacts::ArtifactsState;
use crate::assistant::{build_providers, AssistantState, ChatOrchestrator, OfflineResponder, ProviderRouter};
use crate::compass::CompassApiState;
use crate::config::{resolve_api_keys_from_env, DccfConfig, StoreBackend, StoreConfig};
use crate::error::{Error, Result};
use crate::knowledge::KnowledgeGraph;
use crate::store::{FileStore, KnowledgeStore, RestStore};
use axum::Router;
use std::sync::Arc;

/// Every long-lived service, built once from configuration
pub struct AppServices {
    config: DccfConfig,
    store: Option<Arc<dyn KnowledgeStore>>,
    router: Arc<ProviderRouter>,
    orchestrator: Arc<ChatOrchestrator>,
}

impl AppServices {
    /// Build store, knowledge graph, providers and orchestrator
    pub async fn from_config(config: DccfConfig) -> Result<Self> {
        let store = open_store(&config.store).await?;

        let graph = Arc::new(KnowledgeGraph::new(store.clone(), config.knowledge.clone()));

        let keys = resolve_api_keys_from_env(&config.providers);
        let providers = build_providers(&config.providers, &keys)?;
        let router = Arc::new(ProviderRouter::new(
            providers,
            OfflineResponder::new()?,
            &config.providers,
            config.chat.default_mode.into(),
        ));
        tracing::info!(
            providers = ?router.provider_names(),
            default_mode = router.default_mode().as_str(),
            store = store.as_ref().map_or("none", |s| s.name()),
            "Assistant services ready"
        );

        let orchestrator = Arc::new(ChatOrchestrator::new(
            router.clone(),
            graph,
            config.chat.history_limit,
        ));

        Ok(Self {
            config,
            store,
            router,
            orchestrator,
        })
    }

    pub fn config(&self) -> &DccfConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<dyn KnowledgeStore>> {
        self.store.as_ref()
    }

    pub fn provider_router(&self) -> &Arc<ProviderRouter> {
        &self.router
    }

    pub fn orchestrator(&self) -> &Arc<ChatOrchestrator> {
        &self.orchestrator
    }

    /// The full HTTP application over these services
    pub fn app(&self) -> Router {
        build_app(
            AssistantState {
                orchestrator: self.orchestrator.clone(),
                router: self.router.clone(),
                chunk_size: self.config.chat.chunk_size,
            },
            CompassApiState {
                store: self.store.clone(),
            },
            ArtifactsState {
                store: self.store.clone(),
            },
            &self.config.server.cors_origins,
        )
    }

    /// Serve until Ctrl+C
    pub async fn serve(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
        tracing::info!("DCCF server listening on {}", addr);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("DCCF server stopped");
        Ok(())
    }
}

/// Open the configured store.
///
/// A REST backend without URL or key runs store-less: the assistant still
/// answers, Compass serves its fallback and artifact intake reports a
/// configuration error.
async fn open_store(config: &StoreConfig) -> Result<Option<Arc<dyn KnowledgeStore>>> {
    match config.backend {
        StoreBackend::File => {
            let store = FileStore::new(&config.data_dir).await?;
            Ok(Some(Arc::new(store)))
        }
        StoreBackend::Rest => match (&config.rest_url, config.rest_key()) {
            (Some(url), Some(key)) => Ok(Some(Arc::new(RestStore::new(url.clone(), key)?))),
            _ => {
                tracing::warn!(
                    key_ref = %config.rest_key_ref,
                    "REST store selected but URL or key is missing; running without a store"
                );
                Ok(None)
            }
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn file_config(dir: &std::path::Path) -> DccfConfig {
        let mut config = DccfConfig::default();
        config.store.data_dir = dir.to_path_buf();
        config.providers.order.clear();
        config
    }

    #[tokio::test]
    async fn test_file_backend_services() {
        let dir = tempfile::tempdir().unwrap();
        let services = AppServices::from_config(file_config(dir.path())).await.unwrap();
        assert_eq!(services.store().map(|s| s.name()), Some("file"));
        assert!(services.provider_router().provider_names().is_empty());

        let resp = services
            .app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rest_backend_without_url_runs_storeless() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(dir.path());
        config.store.backend = StoreBackend::Rest;
        config.store.rest_url = None;
        let services = AppServices::from_config(config).await.unwrap();
        assert!(services.store().is_none());
    }
}
