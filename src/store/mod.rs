//! Knowledge store: the persisted collaborator behind the AI core
//!
//! The core only ever reads artifacts and Compass objects; the artifact
//! intake endpoint is the single writer. Two backends ship:
//!
//! - [`FileStore`]: JSON documents under a local data directory
//! - [`RestStore`]: PostgREST-compatible HTTP tables (`artifacts`,
//!   `compass_objects`), e.g. a Supabase project

pub mod file;
pub mod rest;
pub mod types;

pub use file::FileStore;
pub use rest::RestStore;
pub use types::{ArtifactId, ArtifactRow, CompassRow, NewArtifact};

use crate::error::Result;
use async_trait::async_trait;

/// Query capability over persisted artifacts and Compass objects
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Backend name for logs and diagnostics
    fn name(&self) -> &str;

    /// Most recently created artifacts first, optionally filtered by owner
    async fn recent_artifacts(&self, owner: Option<&str>, limit: usize) -> Result<Vec<ArtifactRow>>;

    /// Insert one artifact and return its identifier
    async fn insert_artifact(&self, artifact: NewArtifact) -> Result<ArtifactId>;

    /// Most recently updated Compass object matching owner and path
    async fn latest_compass(
        &self,
        owner: Option<&str>,
        path: Option<&str>,
    ) -> Result<Option<CompassRow>>;
}
