//! Runtime configuration, read from the environment (and `.env`, if present).

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llava-v1.5-7b-4096-preview";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5020";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub bind_addr: SocketAddr,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load `.env` (ignored when absent) and read the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("GROQ_API_KEY must be set (environment or .env file)"))?;

        let api_base = lookup("CAPTION_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = lookup("CAPTION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let bind_addr = lookup("CAPTION_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("CAPTION_BIND_ADDR is not a socket address: {bind_addr}"))?;

        let static_dir = lookup("CAPTION_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let max_upload_bytes = match lookup("CAPTION_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CAPTION_MAX_UPLOAD_BYTES is not a byte count: {raw}"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            api_key,
            api_base,
            model,
            bind_addr,
            static_dir,
            max_upload_bytes,
        })
    }
}
