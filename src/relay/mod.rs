// src/relay/mod.rs - Drives one upstream generation per activated session
//
// Each activated session gets its own task. The task forwards upstream units
// to a bounded channel that the HTTP layer turns into SSE. The task alone
// performs cleanup, once, whichever way the stream ends: upstream exhaustion,
// an explicit stop, the client going away, or a failure.

pub mod events;

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::infra::config::ModelConfig;
use crate::infra::errors::ChatError;
use crate::provider::{uniform_safety, ChatRequest, ModelProvider, Part, SafetySetting, Turn};
use crate::session::{ActiveSession, ConversationHistory, SessionRegistry};
use crate::util::preview;

pub use events::StreamEvent;

/// Events buffered per session before the relay waits on the client.
pub const CHANNEL_CAPACITY: usize = 32;

/// Per-request upstream parameters.
#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    pub model: String,
    pub system_instruction: Option<String>,
    /// Prepended to the first text part of the current turn only.
    pub context_prefix: String,
    pub safety: Vec<SafetySetting>,
}

impl RelaySettings {
    pub fn from_config(config: &ModelConfig) -> Self {
        let system = config.system_instruction.trim();
        Self {
            model: config.name.clone(),
            system_instruction: (!system.is_empty()).then(|| system.to_string()),
            context_prefix: config.context_prefix.clone(),
            safety: uniform_safety(config.safety_threshold),
        }
    }
}

/// How the forwarding loop ended.
#[derive(Debug)]
enum Outcome {
    Completed { user_parts: Vec<Part>, text: String },
    Cancelled,
    /// The push channel's receiver is gone. Nothing more can be sent.
    Disconnected,
    Failed(ChatError),
}

#[derive(Clone)]
pub struct StreamRelay {
    registry: SessionRegistry,
    history: ConversationHistory,
    provider: Arc<dyn ModelProvider>,
    settings: Arc<RelaySettings>,
}

impl StreamRelay {
    pub fn new(
        registry: SessionRegistry,
        history: ConversationHistory,
        provider: Arc<dyn ModelProvider>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            registry,
            history,
            provider,
            settings: Arc::new(settings),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Activate `id` and start streaming it. The receiver yields events in
    /// upstream order and closes after cleanup has finished.
    pub fn open(&self, id: &str) -> Result<mpsc::Receiver<StreamEvent>, ChatError> {
        let session = self.registry.activate(id)?;
        tracing::info!("[{id}] Client connected for streaming");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let relay = self.clone();
        tokio::spawn(async move {
            relay.drive(session, tx).await;
        });
        Ok(rx)
    }

    async fn drive(self, session: ActiveSession, tx: mpsc::Sender<StreamEvent>) {
        let id = session.id.clone();

        match self.forward(&session, &tx).await {
            Outcome::Completed { .. } if tx.is_closed() => {
                tracing::info!("[{id}] Client closed before done, turn discarded");
            }
            Outcome::Completed { user_parts, text } => {
                if text.trim().is_empty() {
                    tracing::info!("[{id}] Empty response, turn not added to history");
                } else {
                    let len = self.history.record_exchange(user_parts, text);
                    tracing::info!("[{id}] Added turn to history. History length: {len}");
                }
                tracing::info!("[{id}] Stream finished naturally");
                let _ = tx.send(StreamEvent::done()).await;
            }
            Outcome::Cancelled => {
                tracing::info!("[{id}] Stream stopped, turn discarded");
                let _ = tx.send(StreamEvent::stopped()).await;
            }
            Outcome::Disconnected => {
                tracing::info!("[{id}] Client closed connection, turn discarded");
            }
            Outcome::Failed(e) => {
                tracing::error!("[{id}] Error during streaming: {e}");
                let _ = tx.send(StreamEvent::error(e.user_message())).await;
            }
        }

        self.registry.delete(&id).await;
        drop(tx);
        tracing::info!("[{id}] Stream resources cleaned up");
    }

    async fn forward(&self, session: &ActiveSession, tx: &mpsc::Sender<StreamEvent>) -> Outcome {
        let id = session.id.as_str();

        let (request, user_parts) = match self.build_request(session).await {
            Ok(built) => built,
            Err(e) => return Outcome::Failed(e),
        };
        tracing::info!(
            "[{id}] Starting {} stream. Context turns: {}",
            self.provider.name(),
            request.contents.len()
        );

        let started = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => return Outcome::Cancelled,
            _ = tx.closed() => return Outcome::Disconnected,
            started = self.provider.chat_stream(request) => started,
        };
        let mut upstream = match started {
            Ok(stream) => stream,
            Err(e) => return Outcome::Failed(e),
        };

        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = session.cancel.cancelled() => return Outcome::Cancelled,
                _ = tx.closed() => return Outcome::Disconnected,
                next = upstream.next() => next,
            };
            let Some(item) = next else { break };

            // A stop that raced the unit wins; the unit is not forwarded.
            if session.cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => return Outcome::Failed(e),
            };
            if chunk.blocked {
                tracing::warn!("[{id}] Content blocked due to safety settings");
                return Outcome::Failed(ChatError::SafetyBlocked);
            }
            if chunk.delta.is_empty() {
                continue;
            }

            text.push_str(&chunk.delta);
            if tx.send(StreamEvent::chunk(chunk.delta)).await.is_err() {
                return Outcome::Disconnected;
            }
        }

        Outcome::Completed { user_parts, text }
    }

    /// History (oldest-first) plus the current turn, with the attachment
    /// inlined and the context prefix applied to the request copy only.
    /// Also returns the unframed user parts for recording in history.
    async fn build_request(
        &self,
        session: &ActiveSession,
    ) -> Result<(ChatRequest, Vec<Part>), ChatError> {
        let mut parts = session.input.clone();
        if let Some(ref attachment) = session.attachment {
            tracing::info!(
                "[{}] Reading image file: {}",
                session.id,
                attachment.path.display()
            );
            parts.push(attachment.to_part().await?);
        }
        if parts.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        if let Some(text) = parts.iter().find_map(Part::as_text) {
            tracing::debug!("[{}] Prompt: {}", session.id, preview(text, 120));
        }

        let mut contents = self.history.snapshot();
        contents.push(Turn::user(frame_first_text(
            &parts,
            &self.settings.context_prefix,
        )));

        let request = ChatRequest {
            model: self.settings.model.clone(),
            contents,
            system: self.settings.system_instruction.clone(),
            safety: self.settings.safety.clone(),
        };
        Ok((request, parts))
    }
}

fn frame_first_text(parts: &[Part], prefix: &str) -> Vec<Part> {
    let mut framed = parts.to_vec();
    if let Some(Part::Text(text)) = framed.iter_mut().find(|p| matches!(p, Part::Text(_))) {
        *text = format!("{prefix}{text}");
    }
    framed
}
