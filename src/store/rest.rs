//! PostgREST-backed knowledge store
//!
//! Talks to the `artifacts` and `compass_objects` tables of a
//! PostgREST-compatible endpoint (Supabase exposes one at `/rest/v1`).

use crate::error::{Error, Result};
use crate::store::types::{ArtifactId, ArtifactRow, CompassRow, NewArtifact};
use crate::store::KnowledgeStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const ARTIFACT_COLUMNS: &str = "id,type,title,description,created_at";
const UNTITLED: &str = "Untitled artifact";
const COMPASS_COLUMNS: &str = "quadrants,overall_alignment,research_drift,weekly_momentum,next_best_action,ai_insights,updated_at";

/// HTTP knowledge store over PostgREST tables
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RestStore {
    /// Create a store for `base_url` (without the `/rest/v1` suffix)
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

/// Artifact row as returned by PostgREST; timestamps may lack a zone
#[derive(Deserialize)]
struct RawArtifactRow {
    id: ArtifactId,
    #[serde(rename = "type", default)]
    artifact_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

/// Compass row as returned by PostgREST; `updated_at` may lack a zone and
/// `quadrants` is decoded on its own so a malformed blob only drops itself
#[derive(Deserialize)]
struct RawCompassRow {
    #[serde(default)]
    quadrants: Option<Value>,
    #[serde(default)]
    overall_alignment: Option<f64>,
    #[serde(default)]
    research_drift: Option<f64>,
    #[serde(default)]
    weekly_momentum: Option<f64>,
    #[serde(default)]
    next_best_action: Option<String>,
    #[serde(default)]
    ai_insights: Option<Vec<String>>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl RawCompassRow {
    fn into_row(self, owner: Option<&str>, path: Option<&str>) -> CompassRow {
        let quadrants = self.quadrants.filter(|q| !q.is_null()).and_then(|q| {
            serde_json::from_value(q)
                .map_err(|e| tracing::debug!(error = %e, "Ignoring malformed quadrants column"))
                .ok()
        });
        CompassRow {
            user_id: owner.map(str::to_string),
            path: path.map(str::to_string),
            quadrants,
            overall_alignment: self.overall_alignment,
            research_drift: self.research_drift,
            weekly_momentum: self.weekly_momentum,
            next_best_action: self.next_best_action,
            ai_insights: self.ai_insights,
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[derive(Deserialize)]
struct InsertedRow {
    id: ArtifactId,
}

#[async_trait]
impl KnowledgeStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn recent_artifacts(&self, owner: Option<&str>, limit: usize) -> Result<Vec<ArtifactRow>> {
        let mut query = vec![
            ("select", ARTIFACT_COLUMNS.to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("user_id", format!("eq.{}", owner)));
        }

        let resp = self
            .authorize(self.client.get(self.table_url("artifacts")))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<RawArtifactRow> = checked(resp, "artifacts query").await?.json().await?;

        Ok(rows
            .into_iter()
            .map(|raw| ArtifactRow {
                id: raw.id,
                artifact_type: raw.artifact_type.unwrap_or_else(|| "artifact".to_string()),
                title: raw.title.unwrap_or_else(|| UNTITLED.to_string()),
                description: raw.description.unwrap_or_default(),
                created_at: raw.created_at.as_deref().and_then(parse_timestamp),
                user_id: owner.map(str::to_string),
            })
            .collect())
    }

    async fn insert_artifact(&self, artifact: NewArtifact) -> Result<ArtifactId> {
        let resp = self
            .authorize(self.client.post(self.table_url("artifacts")))
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .json(&artifact)
            .send()
            .await?;
        let rows: Vec<InsertedRow> = checked(resp, "artifact insert").await?.json().await?;

        rows.into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| Error::Store("Artifact insert returned no row".to_string()))
    }

    async fn latest_compass(
        &self,
        owner: Option<&str>,
        path: Option<&str>,
    ) -> Result<Option<CompassRow>> {
        let mut query = vec![
            ("select", COMPASS_COLUMNS.to_string()),
            ("order", "updated_at.desc".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(owner) = owner {
            query.push(("user_id", format!("eq.{}", owner)));
        }
        if let Some(path) = path {
            query.push(("path", format!("eq.{}", path)));
        }

        let resp = self
            .authorize(self.client.get(self.table_url("compass_objects")))
            .query(&query)
            .send()
            .await?;
        let rows: Vec<RawCompassRow> = checked(resp, "compass query").await?.json().await?;
        Ok(rows.into_iter().next().map(|raw| raw.into_row(owner, path)))
    }
}

async fn checked(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Store(format!("{} failed ({}): {}", what, status, body)))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|naive| naive.and_utc())
        })
}
