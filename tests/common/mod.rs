// tests/common/mod.rs - Scripted provider and helpers shared by integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use scholarchat::infra::errors::ChatError;
use scholarchat::provider::*;
use scholarchat::relay::{RelaySettings, StreamEvent, StreamRelay};
use scholarchat::session::{ConversationHistory, SessionRegistry};

/// What the next `chat_stream` call produces.
pub enum Script {
    /// Yield these units, then end.
    Units(Vec<Result<ChatChunk, ChatError>>),
    /// Yield these units, then wait for `release` before ending.
    Held {
        units: Vec<ChatChunk>,
        release: Arc<Notify>,
    },
    /// Yield these units, then drop the receiver in `slot` as the stream ends.
    Hangup {
        units: Vec<ChatChunk>,
        slot: ReceiverSlot,
    },
    /// Fail before any unit is produced.
    Refuse(String),
}

/// Parking spot for a push-channel receiver the provider drops on exhaustion.
pub type ReceiverSlot = Arc<Mutex<Option<mpsc::Receiver<StreamEvent>>>>;

/// A provider that replays canned scripts without any network calls.
pub struct MockProvider {
    scripts: Mutex<Vec<Script>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(pieces: &[&str]) -> Arc<Self> {
        Self::new(vec![Script::Units(
            pieces.iter().map(|p| Ok(ChatChunk::text(*p))).collect(),
        )])
    }

    pub fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, ChatError> {
        self.requests.lock().unwrap().push(request);

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                Script::Units(vec![])
            } else {
                scripts.remove(0)
            }
        };

        match script {
            Script::Units(units) => Ok(Box::pin(futures::stream::iter(units))),
            Script::Held { units, release } => {
                let stream = async_stream::stream! {
                    for unit in units {
                        yield Ok(unit);
                    }
                    release.notified().await;
                };
                Ok(Box::pin(stream))
            }
            Script::Hangup { units, slot } => {
                let stream = async_stream::stream! {
                    for unit in units {
                        yield Ok(unit);
                    }
                    drop(slot.lock().unwrap().take());
                };
                Ok(Box::pin(stream))
            }
            Script::Refuse(message) => Err(ChatError::Provider {
                provider: "mock".into(),
                message,
            }),
        }
    }
}

pub fn test_settings() -> RelaySettings {
    RelaySettings {
        model: "mock-model".into(),
        system_instruction: Some("You are a scholarship assistant.".into()),
        context_prefix: "Context: ".into(),
        safety: uniform_safety(HarmBlockThreshold::BlockMediumAndAbove),
    }
}

pub fn relay_with(provider: Arc<MockProvider>, max_turns: usize) -> StreamRelay {
    StreamRelay::new(
        SessionRegistry::new(Duration::from_secs(60)),
        ConversationHistory::new(max_turns),
        provider,
        test_settings(),
    )
}

pub fn text(s: &str) -> Vec<Part> {
    vec![Part::Text(s.into())]
}

/// Drain a push channel until the relay closes it.
pub async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("relay did not close the channel in time")
    {
        events.push(event);
    }
    events
}

pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
