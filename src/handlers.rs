//! The three HTTP endpoints.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::normalize::{self, jpeg_target};
use crate::server::AppState;
use crate::staging::StagedUpload;

pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub encoded_image: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptionRequest {
    pub encoded_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaptionResponse {
    pub success: bool,
    pub caption: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// `POST /upload`: stage the `image` field, normalize it, return the base64 JPEG.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| AppError::BadRequest("No file uploaded".into()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    if file_name.is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }
    info!(file_name = %file_name, len = bytes.len(), "received upload");

    let static_dir = state.static_dir.clone();
    let encoded = tokio::task::spawn_blocking(move || -> Result<String, AppError> {
        let mut staged = StagedUpload::create(&static_dir, &file_name, &bytes)?;
        // Tracked before conversion so a partially written JPEG is removed too.
        if let Some(target) = jpeg_target(staged.path()) {
            staged.track(target);
        }
        Ok(normalize::normalize(staged.path())?)
    })
    .await
    .map_err(|e| AppError::Internal(format!("upload processing aborted: {e}")))??;

    Ok(Json(UploadResponse {
        success: true,
        encoded_image: encoded,
    }))
}

/// `POST /get_caption`: ask the captioner about a previously encoded image.
#[instrument(skip_all)]
pub async fn get_caption(
    State(state): State<AppState>,
    body: Result<Json<CaptionRequest>, JsonRejection>,
) -> Result<Json<CaptionResponse>, AppError> {
    let Json(request) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::BadRequest("No encoded image provided".into())
        }
    })?;
    let encoded_image = request
        .encoded_image
        .ok_or_else(|| AppError::BadRequest("No encoded image provided".into()))?;

    let caption = state.captioner.caption(&encoded_image, &state.model).await?;

    Ok(Json(CaptionResponse {
        success: true,
        caption,
    }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
