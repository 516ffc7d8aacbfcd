//! Artifact intake
//!
//! The single writer of research artifacts. Anything inserted here becomes
//! a persisted knowledge node on the next context build.

pub mod handler;

pub use handler::{artifacts_router, ArtifactsState};
