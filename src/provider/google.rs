// src/provider/google.rs - Google Generative AI (Gemini) provider

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};

use super::{ChatChunk, ChatRequest, ChunkStream, ModelProvider, Part};
use crate::infra::errors::ChatError;

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different endpoint, e.g. a proxy from `model.base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the Gemini request body from a ChatRequest.
    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": request.contents,
        });

        if let Some(ref system) = request.system {
            body["system_instruction"] = serde_json::json!({
                "parts": [Part::Text(system.clone())],
            });
        }

        if !request.safety.is_empty() {
            body["safetySettings"] = serde_json::json!(request.safety);
        }

        body
    }

    fn provider_error(message: String) -> ChatError {
        ChatError::Provider {
            provider: "google".into(),
            message,
        }
    }
}

/// Interpret one streamed `GenerateContentResponse`.
///
/// Returns `None` for units that carry neither text nor a block signal
/// (e.g. trailing usage-only frames).
fn parse_stream_unit(parsed: &serde_json::Value) -> Option<ChatChunk> {
    if parsed["promptFeedback"]["blockReason"].is_string() {
        return Some(ChatChunk::blocked());
    }

    let candidate = &parsed["candidates"][0];
    let rated_blocked = candidate["safetyRatings"]
        .as_array()
        .is_some_and(|ratings| ratings.iter().any(|r| r["blocked"].as_bool() == Some(true)));
    if rated_blocked || candidate["finishReason"].as_str() == Some("SAFETY") {
        return Some(ChatChunk::blocked());
    }

    let delta: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    if delta.is_empty() {
        None
    } else {
        Some(ChatChunk::text(delta))
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, ChatError> {
        let body = self.build_request_body(&request);

        // Key goes in a header so it never shows up in URL-bearing errors.
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model,
        );

        let mut es = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .eventsource()
            .map_err(|e| Self::provider_error(format!("Cannot build SSE request: {e}")))?;

        let stream = async_stream::stream! {
            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => {
                        let parsed: serde_json::Value = match serde_json::from_str(&msg.data) {
                            Ok(v) => v,
                            Err(e) => {
                                yield Err(Self::provider_error(format!(
                                    "Failed to parse SSE data: {e}"
                                )));
                                break;
                            }
                        };
                        if let Some(chunk) = parse_stream_unit(&parsed) {
                            yield Ok(chunk);
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                            yield Err(ChatError::RateLimited {
                                provider: "google".into(),
                                retry_after_ms: 5000,
                            });
                        } else {
                            let error_body = response.text().await.unwrap_or_default();
                            yield Err(Self::provider_error(format!(
                                "HTTP {status}: {error_body}"
                            )));
                        }
                        break;
                    }
                    Err(reqwest_eventsource::Error::Transport(e)) => {
                        yield Err(Self::provider_error(format!(
                            "Transport error: {}",
                            e.without_url()
                        )));
                        break;
                    }
                    Err(e) => {
                        yield Err(Self::provider_error(format!("SSE stream error: {e}")));
                        break;
                    }
                }
            }
            es.close();
        };

        Ok(Box::pin(stream))
    }
}
