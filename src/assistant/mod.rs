//! AI orchestration core
//!
//! Turns a user message plus knowledge context into a reply:
//!
//! - [`intent`]: keyword intent flags, keyword extraction, pattern hints
//! - [`offline`]: deterministic templated replies, no network
//! - [`providers`]: OpenAI-compatible and Gemini cloud clients
//! - [`router`]: online/offline/hybrid mode handling over the providers
//! - [`orchestrator`]: request facade with per-conversation history
//! - [`stream`]: chunked replay of a finished reply as SSE events
//! - [`handler`]: the `/api/ai/*` HTTP routes

pub mod handler;
pub mod history;
pub mod intent;
pub mod offline;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod router;
pub mod stream;
pub mod types;

pub use handler::{assistant_router, AssistantState};
pub use offline::OfflineResponder;
pub use orchestrator::ChatOrchestrator;
pub use providers::{build_providers, CloudProvider};
pub use router::ProviderRouter;
pub use types::{ChatRequest, ChatResponse, ClientMode, ProviderMode};
