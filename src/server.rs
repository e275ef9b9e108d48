//! Router assembly and shared request state.

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::caption::{Captioner, ChatCompletionsClient};
use crate::config::Config;
use crate::error::AppError;
use crate::handlers;

/// Per-request state. Cheap to clone; the captioner is shared.
#[derive(Clone)]
pub struct AppState {
    pub captioner: Arc<dyn Captioner>,
    pub model: String,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        model: impl Into<String>,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            captioner,
            model: model.into(),
            static_dir: static_dir.into(),
        }
    }

    /// State backed by the real chat-completions client.
    pub fn from_config(config: &Config) -> Self {
        let client = ChatCompletionsClient::new(&config.api_base, config.api_key.clone());
        Self::new(Arc::new(client), config.model.clone(), config.static_dir.clone())
    }
}

/// A panicking handler still answers with the usual `{"error": ...}` body.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(details).into_response()
}

/// Body limit for `/get_caption`: room for the base64 of the largest
/// accepted upload plus the JSON around it.
pub fn caption_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_mul(4) / 3 + 1024
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/get_caption",
            post(handlers::get_caption)
                .layer(DefaultBodyLimit::max(caption_body_limit(max_upload_bytes))),
        )
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}
