// src/relay/events.rs - Push-channel wire events

use serde::{Deserialize, Serialize};

/// One event on a session's push channel. `Chunk` may repeat; exactly one of
/// `Info`, `Error` or `Done` ends the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk { content: String },
    Info { content: String },
    Error { content: String },
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
        }
    }

    pub fn stopped() -> Self {
        StreamEvent::Info {
            content: "Stream stopped.".into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: content.into(),
        }
    }

    pub fn done() -> Self {
        StreamEvent::Done {
            content: Some("Stream finished.".into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","content":"Failed to encode stream event."}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_wire_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&StreamEvent::chunk("Hel").to_json()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "chunk", "content": "Hel"}));
    }

    #[test]
    fn test_terminal_wire_shapes() {
        assert_eq!(
            serde_json::to_value(StreamEvent::stopped()).unwrap(),
            serde_json::json!({"type": "info", "content": "Stream stopped."})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::error("boom")).unwrap(),
            serde_json::json!({"type": "error", "content": "boom"})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::Done { content: None }).unwrap(),
            serde_json::json!({"type": "done"})
        );
    }

    #[test]
    fn test_parse_done_without_content() {
        let ev: StreamEvent = serde_json::from_str(r#"{"type":"done"}"#).unwrap();
        assert_eq!(ev, StreamEvent::Done { content: None });
    }

    #[test]
    fn test_is_terminal() {
        assert!(!StreamEvent::chunk("x").is_terminal());
        assert!(StreamEvent::done().is_terminal());
        assert!(StreamEvent::stopped().is_terminal());
        assert!(StreamEvent::error("e").is_terminal());
    }
}
