//! facematchd library — application state and router.
//!
//! Split from the binary so integration tests can drive the router
//! in-process with a substitute extractor.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub mod api;
pub mod config;
pub mod engine;
pub mod error;

use engine::EngineHandle;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the comparison engine thread.
    pub engine: EngineHandle,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

/// Build the application router.
///
/// CORS is permissive; request bodies are capped at `max_body_bytes`.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/compare", post(api::compare))
        .route("/compare-files", post(api::compare_files))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
}
