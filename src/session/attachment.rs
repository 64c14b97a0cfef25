// src/session/attachment.rs - Transient uploaded file owned by one session

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::path::PathBuf;

use crate::infra::errors::ChatError;
use crate::provider::Part;

/// An upload persisted by the submission handler. The session that owns it
/// reads it at most once and releases it exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub path: PathBuf,
    pub mime_type: String,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Load the file as a base64 `inline_data` part.
    pub async fn to_part(&self) -> Result<Part, ChatError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(ChatError::Attachment)?;
        Ok(Part::InlineData {
            mime_type: self.mime_type.clone(),
            data: BASE64_STANDARD.encode(bytes),
        })
    }

    /// Delete the file. Failures are logged, never propagated.
    pub async fn release(&self, stream_id: &str) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::info!("[{stream_id}] Deleted temp file: {}", self.path.display()),
            Err(e) => tracing::error!(
                "[{stream_id}] Error deleting temp file {}: {e}",
                self.path.display()
            ),
        }
    }
}
