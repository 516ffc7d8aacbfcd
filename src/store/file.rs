//! File-backed knowledge store
//!
//! Artifacts and Compass objects are persisted as one JSON document per
//! row under `<data_dir>/artifacts/` and `<data_dir>/compass/`. Rows are
//! loaded into memory on startup; writes are awaited so an artifact is
//! visible to the next context build as soon as the insert returns.

use crate::error::{Error, Result};
use crate::store::types::{ArtifactId, ArtifactRow, CompassRow, NewArtifact};
use crate::store::KnowledgeStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// JSON-per-file knowledge store
pub struct FileStore {
    artifacts_dir: PathBuf,
    compass_dir: PathBuf,
    artifacts: Arc<RwLock<Vec<ArtifactRow>>>,
    compass: Arc<RwLock<Vec<CompassRow>>>,
}

impl FileStore {
    /// Open (or create) a store rooted at `data_dir`
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let artifacts_dir = data_dir.join("artifacts");
        let compass_dir = data_dir.join("compass");
        tokio::fs::create_dir_all(&artifacts_dir).await?;
        tokio::fs::create_dir_all(&compass_dir).await?;

        let artifacts: Vec<ArtifactRow> = load_dir(&artifacts_dir).await;
        let compass: Vec<CompassRow> = load_dir(&compass_dir).await;
        tracing::debug!(
            artifacts = artifacts.len(),
            compass = compass.len(),
            dir = %data_dir.display(),
            "File store loaded"
        );

        Ok(Self {
            artifacts_dir,
            compass_dir,
            artifacts: Arc::new(RwLock::new(artifacts)),
            compass: Arc::new(RwLock::new(compass)),
        })
    }

    /// Store or replace a Compass object.
    ///
    /// The HTTP surface never writes Compass objects; this is used by
    /// seeding tools and tests.
    pub async fn put_compass(&self, mut row: CompassRow) -> Result<()> {
        if row.updated_at.is_none() {
            row.updated_at = Some(Utc::now());
        }
        let mut rows = self.compass.write().await;
        let name = compass_file_name(row.user_id.as_deref(), row.path.as_deref());
        write_json(&self.compass_dir.join(&name), &row).await?;
        rows.retain(|r| r.user_id != row.user_id || r.path != row.path);
        rows.push(row);
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn recent_artifacts(&self, owner: Option<&str>, limit: usize) -> Result<Vec<ArtifactRow>> {
        let rows = self.artifacts.read().await;
        let mut matching: Vec<ArtifactRow> = rows
            .iter()
            .filter(|r| owner.map_or(true, |o| r.user_id.as_deref() == Some(o)))
            .cloned()
            .collect();
        // Newest first; rows without a timestamp sink to the end
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn insert_artifact(&self, artifact: NewArtifact) -> Result<ArtifactId> {
        let mut rows = self.artifacts.write().await;
        let next = rows
            .iter()
            .filter_map(|r| match r.id {
                ArtifactId::Number(n) => Some(n),
                ArtifactId::Text(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let row = ArtifactRow {
            id: ArtifactId::Number(next),
            artifact_type: artifact.artifact_type,
            title: artifact.title,
            description: artifact.description,
            created_at: Some(Utc::now()),
            user_id: artifact.user_id,
        };
        write_json(&self.artifacts_dir.join(format!("{}.json", next)), &row).await?;
        rows.push(row);

        tracing::debug!(id = next, "Artifact persisted");
        Ok(ArtifactId::Number(next))
    }

    async fn latest_compass(
        &self,
        owner: Option<&str>,
        path: Option<&str>,
    ) -> Result<Option<CompassRow>> {
        let rows = self.compass.read().await;
        Ok(rows
            .iter()
            .filter(|r| owner.map_or(true, |o| r.user_id.as_deref() == Some(o)))
            .filter(|r| path.map_or(true, |p| r.path.as_deref() == Some(p)))
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at))
            .cloned())
    }
}

/// Load every `*.json` document in a directory, skipping unreadable files
async fn load_dir<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    let mut items = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return items,
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str::<T>(&data) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Failed to parse {}: {}", path.display(), e),
            },
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    items
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| Error::Store(format!("Failed to write {}: {}", path.display(), e)))
}

fn compass_file_name(owner: Option<&str>, path: Option<&str>) -> String {
    let raw = format!("{}{}", owner.unwrap_or("global"), path.unwrap_or("/"));
    let safe: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}.json", safe)
}
