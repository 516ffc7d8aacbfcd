//! Knowledge retrieval for the assistant
//!
//! Provides:
//! - Static catalog nodes describing the DCCF system
//! - Keyword + recency scoring with derived summaries, insights and
//!   recommendations
//! - A graph facade merging persisted artifacts, the catalog and recent
//!   conversation turns

pub mod catalog;
pub mod graph;
pub mod scorer;
pub mod types;

pub use graph::KnowledgeGraph;
pub use types::*;
