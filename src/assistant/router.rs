//! Provider router: mode state machine over cloud providers and the
//! offline responder.
//!
//! - `offline`: offline responder only
//! - `online`: first non-empty cloud reply in configured order, offline
//!   when every provider fails
//! - `hybrid`: online attempt and offline reply run concurrently; both are
//!   blended when the cloud answered, otherwise the offline reply stands
//!
//! `generate` never fails. Provider errors and timeouts are logged and
//! skipped; there are no retries.

use crate::assistant::offline::{fallback_reply, OfflineResponder, EMPTY_MESSAGE_REPLY};
use crate::assistant::prompt::{system_prompt, user_prompt};
use crate::assistant::providers::{CloudProvider, CompletionRequest};
use crate::assistant::types::{ChatTurn, ProviderMode};
use crate::config::ProvidersConfig;
use crate::knowledge::{KnowledgeContext, Role};
use std::sync::Arc;
use std::time::Duration;

/// Label for replies produced without any cloud provider
pub const OFFLINE_LABEL: &str = "offline";

const HYBRID_FOOTER: &str = "_Offline scholar_ · pattern + emotional calibration.\n\
_Online model_ · expanded detail using your stored context and broader knowledge.";

const RECENT_USER_TURNS: usize = 3;

/// Reply text plus the label of whoever produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedReply {
    pub text: String,
    /// `offline`, a provider id, or `hybrid:<provider id>`
    pub provider: String,
}

/// Inputs for one generation
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub message: &'a str,
    pub history: &'a [ChatTurn],
    pub context: &'a KnowledgeContext,
    /// `None` uses the router default
    pub mode: Option<ProviderMode>,
    pub rapid: bool,
    pub user: Option<&'a str>,
}

pub struct ProviderRouter {
    providers: Vec<Arc<dyn CloudProvider>>,
    offline: OfflineResponder,
    default_mode: ProviderMode,
    timeout: Duration,
    temperature: f32,
    rapid_max_tokens: u32,
    full_max_tokens: u32,
}

impl ProviderRouter {
    pub fn new(
        providers: Vec<Arc<dyn CloudProvider>>,
        offline: OfflineResponder,
        config: &ProvidersConfig,
        default_mode: ProviderMode,
    ) -> Self {
        Self {
            providers,
            offline,
            default_mode,
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
            rapid_max_tokens: config.rapid_max_tokens,
            full_max_tokens: config.full_max_tokens,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Available providers, in call order
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn default_mode(&self) -> ProviderMode {
        self.default_mode
    }

    pub async fn generate(&self, request: GenerateRequest<'_>) -> RoutedReply {
        let message = request.message.trim();
        if message.is_empty() {
            return RoutedReply {
                text: EMPTY_MESSAGE_REPLY.to_string(),
                provider: OFFLINE_LABEL.to_string(),
            };
        }
        let request = GenerateRequest { message, ..request };
        let mode = request.mode.unwrap_or(self.default_mode);
        tracing::debug!(mode = mode.as_str(), rapid = request.rapid, "Routing generation");

        match mode {
            ProviderMode::Offline => self.offline_only(&request),
            ProviderMode::Online => match self.try_online(&request).await {
                Some((provider, text)) => RoutedReply { text, provider },
                None => self.offline_only(&request),
            },
            ProviderMode::Hybrid => {
                let (online, offline) = tokio::join!(self.try_online(&request), async {
                    self.offline_text(&request)
                });
                match online {
                    Some((provider, text)) => RoutedReply {
                        text: blend(&offline, &text, request.rapid),
                        provider: format!("hybrid:{}", provider),
                    },
                    None => RoutedReply {
                        text: offline,
                        provider: OFFLINE_LABEL.to_string(),
                    },
                }
            }
        }
    }

    fn offline_only(&self, request: &GenerateRequest<'_>) -> RoutedReply {
        RoutedReply {
            text: self.offline_text(request),
            provider: OFFLINE_LABEL.to_string(),
        }
    }

    fn offline_text(&self, request: &GenerateRequest<'_>) -> String {
        let user_turns: Vec<String> = request
            .history
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.clone())
            .collect();
        let start = user_turns.len().saturating_sub(RECENT_USER_TURNS);

        let text = self
            .offline
            .respond(request.message, &user_turns[start..], request.context, request.rapid);
        if text.trim().is_empty() {
            return fallback_reply(request.message, &request.context.artifacts);
        }
        text
    }

    /// First non-empty cloud reply as `(provider id, text)`
    async fn try_online(&self, request: &GenerateRequest<'_>) -> Option<(String, String)> {
        if self.providers.is_empty() {
            return None;
        }

        let completion = CompletionRequest {
            system_prompt: system_prompt(&request.context.artifacts),
            user_prompt: user_prompt(request.message, request.context, request.history, request.rapid),
            temperature: self.temperature,
            max_tokens: if request.rapid {
                self.rapid_max_tokens
            } else {
                self.full_max_tokens
            },
            user: request.user.map(str::to_string),
        };

        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, provider.complete(&completion)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    tracing::debug!(provider = provider.name(), "Cloud provider answered");
                    return Some((provider.name().to_string(), text));
                }
                Ok(Ok(_)) => {
                    tracing::warn!(provider = provider.name(), "Cloud provider returned an empty reply");
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Cloud provider failed");
                }
                Err(_) => {
                    tracing::warn!(
                        provider = provider.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Cloud provider timed out"
                    );
                }
            }
        }
        None
    }
}

fn blend(offline: &str, online: &str, rapid: bool) -> String {
    let parts: Vec<&str> = if rapid {
        vec![offline, "", online, "", HYBRID_FOOTER]
    } else {
        vec![offline, "", "——", "", online, "", HYBRID_FOOTER]
    };
    parts.join("\n")
}
