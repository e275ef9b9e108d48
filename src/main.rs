// Image caption service: upload → JPEG/base64 → multimodal caption.
//
// Configuration comes from the environment or a `.env` file:
//   GROQ_API_KEY              (required)
//   CAPTION_API_BASE          default https://api.groq.com/openai/v1
//   CAPTION_MODEL             default llava-v1.5-7b-4096-preview
//   CAPTION_BIND_ADDR         default 0.0.0.0:5020
//   CAPTION_STATIC_DIR        default static
//   CAPTION_MAX_UPLOAD_BYTES  default 16 MiB

use anyhow::{Context, Result};
use image_caption_service::{router, AppState, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    std::fs::create_dir_all(&config.static_dir).with_context(|| {
        format!(
            "failed to create static directory {}",
            config.static_dir.display()
        )
    })?;

    let state = AppState::from_config(&config);
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, model = %config.model, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
