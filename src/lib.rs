//! DCCF - Doctoral research operating system with an offline-first AI assistant
//!
//! DCCF helps a doctoral researcher keep their work aligned with a
//! four-quadrant Compass (Problem, Gap, Contribution, Alignment), collects
//! free-form research artifacts, and answers questions through an AI
//! assistant that uses that stored context. When no cloud model is
//! reachable, a deterministic local responder answers instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         HTTP API (axum)                          │
//! │   /api/ai/chat   /api/ai/research   /api/compass   /api/artifacts│
//! └───────┬──────────────────────────────────────┬───────────────────┘
//!         │                                      │
//! ┌───────▼────────────────┐            ┌────────▼─────────┐
//! │   Chat Orchestrator    │            │  Knowledge Store │
//! │ - history per key      │            │  - FileStore     │
//! │ - context resolution   │            │  - RestStore     │
//! └───────┬────────┬───────┘            └────────▲─────────┘
//!         │        │                             │
//! ┌───────▼──────┐ ┌▼──────────────────────┐     │
//! │ Provider     │ │ Knowledge Graph       ├─────┘
//! │ Router       │ │ - static catalog      │
//! │ - online     │ │ - conversation buffer │
//! │ - offline    │ │ - keyword scorer      │
//! │ - hybrid     │ └───────────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`assistant`]: intent, offline responder, providers, routing, chat
//! - [`knowledge`]: knowledge nodes, scoring, context derivation
//! - [`store`]: persisted artifacts and Compass objects
//! - [`compass`]: Compass summary with constant fallback
//! - [`artifacts`]: artifact intake
//! - [`api`]: unified HTTP router
//! - [`server`]: service wiring and lifecycle
//! - [`config`]: configuration management

pub mod api;
pub mod artifacts;
pub mod assistant;
pub mod compass;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod server;
pub mod store;

pub use config::DccfConfig;
pub use error::{Error, Result};
