//! HTTP service that normalizes uploaded images to base64 JPEG and asks a
//! hosted multimodal model to caption them.
//!
//! Endpoints: `POST /upload`, `POST /get_caption`, `GET /health`.

pub mod caption;
pub mod config;
pub mod error;
pub mod handlers;
pub mod normalize;
pub mod server;
pub mod staging;

pub use caption::{Captioner, ChatCompletionsClient};
pub use config::Config;
pub use error::{AppError, CaptionError, NormalizeError};
pub use server::{router, AppState};
