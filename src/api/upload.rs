// src/api/upload.rs - Prompt submission extractor
//
// Accepts multipart forms (`msg` text, optional `image` file) as sent by the
// browser, plus JSON or urlencoded `{ "msg": ... }` bodies. The image is held
// in memory until the handler has validated the submission, so a rejected
// upload never touches the disk.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, StatusCode};
use axum::{Form, Json};
use std::path::Path;

use super::types::{api_error, ApiError, SubmitForm};
use crate::session::Attachment;

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("unnamed")
    }

    /// Write to `dir` under a fresh random name.
    pub async fn persist(&self, dir: &Path) -> std::io::Result<Attachment> {
        let path = dir.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(Attachment::new(path, self.content_type.clone()))
    }
}

/// A parsed `/request-stream` body.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub msg: String,
    pub image: Option<UploadedImage>,
}

impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/json") {
            let Json(form) = Json::<SubmitForm>::from_request(req, state)
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
            return Ok(Submission {
                msg: form.msg,
                image: None,
            });
        }

        let Form(form) = Form::<SubmitForm>::from_request(req, state)
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
        Ok(Submission {
            msg: form.msg,
            image: None,
        })
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        match field.name() {
            Some("msg") => {
                submission.msg = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
            }
            // At most one attachment; later image fields are drained and ignored.
            Some("image") if submission.image.is_none() => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

                // Browsers send an empty part for an untouched file input.
                if bytes.is_empty() && file_name.as_deref().unwrap_or("").is_empty() {
                    continue;
                }
                submission.image = Some(UploadedImage {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(submission)
}
