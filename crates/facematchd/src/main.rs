use anyhow::{Context, Result};
use facematch_core::OnnxExtractor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use facematchd::config::Config;
use facematchd::engine::spawn_engine;
use facematchd::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("facematchd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    info!(model_dir = %config.model_dir.display(), "loading face models");

    // Fail fast: refuse to serve without working models.
    let extractor = OnnxExtractor::load(
        &config.detector_model_path(),
        &config.embedder_model_path(),
    )
    .context("loading ONNX models")?;

    let engine = spawn_engine(extractor);
    let state = AppState::new(engine);
    let app = build_router(state, config.max_body_bytes);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("facematchd listening on http://{addr}");
    info!("health check: http://{addr}/health");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
