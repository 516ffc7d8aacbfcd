//! Cloud text-generation providers
//!
//! Two wire formats cover the three supported services: OpenAI-style chat
//! completions (OpenAI, DeepSeek) and Gemini `generateContent`.

use crate::config::{ProviderKind, ProvidersConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Parameters for one completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// End-user identifier forwarded where the API supports it
    pub user: Option<String>,
}

/// A remote model that turns prompts into text
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider id used in reply labels (`openai`, `deepseek`, `gemini`)
    fn name(&self) -> &str;

    /// Run one completion; an empty reply is returned as-is
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()?)
}

async fn error_for_status(resp: Response, provider: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Provider(format!("{} API error ({}): {}", provider, status, body)))
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions, or any API speaking the same format
pub struct OpenAiCompatibleProvider {
    name: String,
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key: api_key.into(),
            client: http_client()?,
        })
    }
}

#[async_trait]
impl CloudProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false
        });
        if let Some(user) = &request.user {
            body["user"] = json!(user);
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = error_for_status(resp, &self.name).await?.json().await?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default())
    }
}

// ============================================================================
// Gemini generateContent
// ============================================================================

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

/// Google Gemini `models/{model}:generateContent`
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(base_url: &str, model: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key: api_key.into(),
            client: http_client()?,
        })
    }
}

#[async_trait]
impl CloudProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = json!({
            "systemInstruction": {"parts": [{"text": request.system_prompt}]},
            "contents": [{
                "role": "user",
                "parts": [{"text": request.user_prompt}]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens
            }
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: GeminiResponse = error_for_status(resp, "gemini").await?.json().await?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }
}

/// Build the available providers in configured order.
///
/// A provider is available iff its credential resolved; others are skipped.
pub fn build_providers(
    config: &ProvidersConfig,
    keys: &HashMap<ProviderKind, String>,
) -> Result<Vec<Arc<dyn CloudProvider>>> {
    let mut providers: Vec<Arc<dyn CloudProvider>> = Vec::new();
    for kind in &config.order {
        let Some(key) = keys.get(kind) else {
            tracing::debug!(provider = %kind, "No credential, provider skipped");
            continue;
        };
        let cfg = config.get(*kind);
        let provider: Arc<dyn CloudProvider> = match kind {
            ProviderKind::OpenAi | ProviderKind::DeepSeek => Arc::new(
                OpenAiCompatibleProvider::new(kind.as_str(), &cfg.base_url, cfg.model.clone(), key.clone())?,
            ),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(&cfg.base_url, &cfg.model, key.clone())?),
        };
        providers.push(provider);
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "sys".to_string(),
            user_prompt: "hello".to_string(),
            temperature: 0.4,
            max_tokens: 350,
            user: Some("u1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_openai_compatible_success() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
                if auth != Some("Bearer sk-test") || body["max_tokens"] != 350 || body["user"] != "u1" {
                    return (StatusCode::BAD_REQUEST, Json(serde_json::json!({})));
                }
                (
                    StatusCode::OK,
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": "  Cloud answer \n"}}]
                    })),
                )
            }),
        );
        let base = spawn(app).await;
        let provider =
            OpenAiCompatibleProvider::new("openai", &format!("{}/v1/", base), "gpt-4o-mini", "sk-test").unwrap();

        assert_eq!(provider.complete(&request()).await.unwrap(), "Cloud answer");
    }

    #[tokio::test]
    async fn test_openai_compatible_error_status() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn(app).await;
        let provider = OpenAiCompatibleProvider::new("deepseek", &base, "deepseek-chat", "k").unwrap();

        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ref m) if m.contains("429") && m.contains("deepseek")));
    }

    #[tokio::test]
    async fn test_gemini_joins_parts() {
        let app = Router::new().route(
            "/models/gemini-1.5-flash-latest:generateContent",
            post(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()),
                    Some("g-key")
                );
                Json(serde_json::json!({
                    "candidates": [{"content": {"parts": [{"text": "Part one"}, {"text": "Part two"}]}}]
                }))
            }),
        );
        let base = spawn(app).await;
        let provider = GeminiProvider::new(&base, "gemini-1.5-flash-latest", "g-key").unwrap();

        assert_eq!(provider.complete(&request()).await.unwrap(), "Part one\nPart two");
    }

    #[test]
    fn test_build_providers_follows_order_and_keys() {
        let mut config = ProvidersConfig::default();
        config.order = vec![ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::DeepSeek];
        let mut keys = HashMap::new();
        keys.insert(ProviderKind::OpenAi, "sk".to_string());
        keys.insert(ProviderKind::Gemini, "g".to_string());

        let providers = build_providers(&config, &keys).unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["gemini", "openai"]);
    }
}
