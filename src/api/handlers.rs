// src/api/handlers.rs

use axum::extract::{Path, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use std::convert::Infallible;

use crate::api::types::*;
use crate::api::upload::Submission;
use crate::api::AppState;
use crate::provider::Part;
use crate::topic::Classification;
use crate::util::preview;

/// POST /request-stream - Answer directly or create a pending stream.
pub async fn request_stream(
    State(state): State<AppState>,
    submission: Submission,
) -> Result<Json<SubmitResponse>, ApiError> {
    let msg = submission.msg.trim().to_string();

    if msg.is_empty() && submission.image.is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "'msg' text or an image file is required.",
        ));
    }

    if let Some(ref image) = submission.image {
        if !image.is_image() {
            tracing::info!(
                "[INVALID_FILE] User uploaded non-image: {} ({})",
                image.display_name(),
                image.content_type
            );
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Only image files (JPEG, PNG, GIF, WEBP) are supported.",
            ));
        }
    }

    // Text-only prompts go through the FAQ and topic filter first.
    if submission.image.is_none() {
        match state.topic.classify(&msg) {
            Classification::DirectAnswer(answer) => {
                tracing::info!("[FAQ] Matched: \"{}\"", preview(&msg, 80));
                return Ok(Json(SubmitResponse::direct(answer)));
            }
            Classification::Redirect(message) => {
                tracing::info!("[OFF_TOPIC] Query: \"{}\"", preview(&msg, 80));
                return Ok(Json(SubmitResponse::direct(message)));
            }
            Classification::Relevant => {}
        }
    }

    let attachment = match submission.image {
        Some(ref image) => Some(image.persist(&state.upload_dir).await.map_err(|e| {
            tracing::error!("Failed to store upload {}: {e}", image.display_name());
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store uploaded image.",
            )
        })?),
        None => None,
    };

    let input = if msg.is_empty() {
        Vec::new()
    } else {
        vec![Part::Text(msg.clone())]
    };
    let stream_id = state.relay.registry().create(input, attachment);
    tracing::info!(
        "[{stream_id}] Received request. User: \"{}\", File: {}",
        preview(&msg, 80),
        submission
            .image
            .as_ref()
            .map_or("None", |image| image.display_name())
    );

    Ok(Json(SubmitResponse::stream(stream_id)))
}

/// GET /stream/{id} - Server-sent events for a pending stream.
pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut events = state.relay.open(&id).map_err(|_| {
        tracing::info!("[{id}] Invalid or already processed stream ID");
        api_error(StatusCode::NOT_FOUND, "Invalid or expired stream ID.")
    })?;

    // Dropping this stream (client gone) closes the relay's channel.
    let sse = async_stream::stream! {
        while let Some(event) = events.recv().await {
            yield Ok::<Event, Infallible>(Event::default().data(event.to_json()));
        }
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(sse).keep_alive(KeepAlive::default()),
    ))
}

/// POST /stop/{id} - Request cancellation of a streaming session.
pub async fn stop_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StopResponse>, ApiError> {
    match state.relay.registry().request_stop(&id) {
        Ok(()) => Ok(Json(StopResponse {
            message: "Stop signal processed.".into(),
        })),
        Err(_) => {
            tracing::info!("[{id}] Stop request for invalid or non-streaming ID");
            Err(api_error(
                StatusCode::NOT_FOUND,
                "Stream not found or not actively streaming.",
            ))
        }
    }
}

/// GET /health - Simple health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        active_sessions: state.relay.registry().len(),
    })
}
