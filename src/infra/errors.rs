// src/infra/errors.rs - Error types for scholarchat

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    // Upstream errors
    #[error("Provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Response blocked due to safety settings.")]
    SafetyBlocked,

    #[error("Failed to process uploaded image file.")]
    Attachment(#[source] std::io::Error),

    #[error("Cannot generate content with empty prompt parts.")]
    EmptyPrompt,

    // Session lookups
    #[error("Stream '{id}' not found or not in the expected state")]
    SessionNotFound { id: String },

    // Startup
    #[error("No API key configured. Set {var} in the environment.")]
    MissingApiKey { var: String },
}

impl ChatError {
    /// True for lookups that missed; callers answer these with a 404, never a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::SessionNotFound { .. })
    }

    /// Text safe to put in front of a browser. Provider failures carry
    /// upstream detail that stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Provider { .. } => {
                "An error occurred on the server during streaming.".to_string()
            }
            ChatError::RateLimited { .. } => {
                "The assistant is busy right now. Please try again shortly.".to_string()
            }
            other => other.to_string(),
        }
    }
}
