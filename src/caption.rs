//! Caption requests against an OpenAI-compatible chat-completions API.
//!
//! The service only ever sends one kind of request: a single user message
//! holding a fixed instruction and the image as a `data:image/jpeg` URL. The
//! first choice's text is the caption.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CaptionError;

pub const CAPTION_PROMPT: &str = "Analyze this image and provide insights.";

/// Something that can turn a base64 JPEG into a caption.
///
/// Handlers only see this trait, so tests can swap in a fake.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, encoded_image: &str, model: &str) -> Result<String, CaptionError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request<'a>(encoded_image: &str, model: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: CAPTION_PROMPT,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{encoded_image}"),
                    },
                },
            ],
        }],
    }
}

/// Pull the provider's own message out of an error body, if it has one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn first_caption(response: ChatResponse) -> Result<String, CaptionError> {
    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CaptionError::MalformedResponse("response contained no choices".into()))?
        .message
        .content
        .ok_or_else(|| CaptionError::MalformedResponse("first choice has no text content".into()))
}

/// Reqwest client for `{base}/chat/completions`.
///
/// No timeout is set: a request waits for as long as the provider does.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(api_base: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Captioner for ChatCompletionsClient {
    async fn caption(&self, encoded_image: &str, model: &str) -> Result<String, CaptionError> {
        STANDARD.decode(encoded_image)?;

        let request = build_request(encoded_image, model);
        info!(model, len = encoded_image.len(), "requesting caption");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let preview: String = body.chars().take(500).collect();
        debug!(%status, body = %preview, "provider response");

        if !status.is_success() {
            return Err(CaptionError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CaptionError::MalformedResponse(format!("invalid response body: {e}")))?;
        let caption = first_caption(parsed)?;
        info!(len = caption.len(), "caption received");
        Ok(caption)
    }
}
