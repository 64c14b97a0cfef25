// src/provider/mod.rs - Generation provider layer

pub mod google;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::infra::errors::ChatError;

/// Lazy, finite stream of units produced by one generation call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, ChatError>> + Send>>;

/// Core trait for upstream text generation.
///
/// `chat_stream` is invoked once per activated session. The returned stream
/// cannot be restarted; dropping it abandons the upstream call.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, ChatError>;
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    /// History oldest-first, then the current user turn.
    pub contents: Vec<Turn>,
    pub system: Option<String>,
    pub safety: Vec<SafetySetting>,
}

/// One unit produced by the upstream call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatChunk {
    pub delta: String,
    /// The provider refused this unit on safety grounds.
    pub blocked: bool,
}

impl ChatChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            blocked: false,
        }
    }

    pub fn blocked() -> Self {
        Self {
            delta: String::new(),
            blocked: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A segment of a turn. Serializes to the Gemini REST part shape:
/// `{"text": ...}` or `{"inline_data": {"mime_type": ..., "data": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t),
            Part::InlineData { .. } => None,
        }
    }
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// The same threshold applied to every harm category.
pub fn uniform_safety(threshold: HarmBlockThreshold) -> Vec<SafetySetting> {
    HarmCategory::ALL
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_part_wire_shape() {
        let json = serde_json::to_value(Part::Text("hi".into())).unwrap();
        assert_eq!(json, serde_json::json!({"text": "hi"}));
    }

    #[test]
    fn test_inline_part_wire_shape() {
        let part = Part::InlineData {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        };
        let json = serde_json::to_value(part).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"inline_data": {"mime_type": "image/png", "data": "AAAA"}})
        );
    }

    #[test]
    fn test_turn_roles_serialize_lowercase() {
        let json = serde_json::to_value(Turn::model("ok")).unwrap();
        assert_eq!(json["role"], "model");
        let json = serde_json::to_value(Turn::user(vec![])).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_uniform_safety_covers_all_categories() {
        let settings = uniform_safety(HarmBlockThreshold::BlockMediumAndAbove);
        assert_eq!(settings.len(), 4);
        let json = serde_json::to_value(settings[1]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "category": "HARM_CATEGORY_HATE_SPEECH",
                "threshold": "BLOCK_MEDIUM_AND_ABOVE"
            })
        );
    }

    #[test]
    fn test_part_as_text() {
        assert_eq!(Part::Text("a".into()).as_text(), Some("a"));
        let inline = Part::InlineData {
            mime_type: "image/gif".into(),
            data: String::new(),
        };
        assert!(inline.as_text().is_none());
    }

    #[test]
    fn test_chunk_constructors() {
        assert_eq!(ChatChunk::text("x").delta, "x");
        assert!(!ChatChunk::text("x").blocked);
        assert!(ChatChunk::blocked().blocked);
    }
}
