// src/api/types.rs

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Non-multipart submission body (`application/json` or urlencoded).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub msg: String,
}

/// Answer to a prompt submission: either a canned reply or a stream handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    Direct {
        #[serde(rename = "directResponse")]
        direct_response: String,
    },
    Stream {
        #[serde(rename = "streamId")]
        stream_id: String,
    },
}

impl SubmitResponse {
    pub fn direct(text: impl Into<String>) -> Self {
        SubmitResponse::Direct {
            direct_response: text.into(),
        }
    }

    pub fn stream(id: impl Into<String>) -> Self {
        SubmitResponse::Stream {
            stream_id: id.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
