//! Error types and their HTTP rendering.
//!
//! Each component returns its own error enum; handlers lift them into
//! [`AppError`], which decides the status code. Every error response has the
//! same body: `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures of the upload normalizer.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The image could not be decoded, or the JPEG could not be written.
    #[error("Error converting image: {0}")]
    Convert(#[source] image::ImageError),

    /// The (possibly converted) file could not be read back.
    #[error("Error encoding image: {0}")]
    Encode(#[source] std::io::Error),
}

/// Failures of the caption requester. All of them are terminal; none are retried.
#[derive(Debug, Error)]
pub enum CaptionError {
    /// The payload is not standard base64, so no image can be sent.
    #[error("Error processing image with LLM: encoded image is not valid base64: {0}")]
    InvalidImage(#[from] base64::DecodeError),

    /// Connection, TLS or body transfer failure.
    #[error("Error processing image with LLM: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Error processing image with LLM: provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered 2xx but the body had no usable text.
    #[error("Error processing image with LLM: {0}")]
    MalformedResponse(String),
}

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeded the route's limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Caption(#[from] CaptionError),

    /// Writing the upload to the static directory failed.
    #[error("Error saving upload: {0}")]
    Staging(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
