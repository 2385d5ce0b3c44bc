use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let config = state.reassembler.config();
    let prefix = format!("/{}", config.public_url_prefix.trim_matches('/'));
    let artifacts = ServeDir::new(&config.upload_dir);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording artifacts
        .route("/recordings/:key", get(handlers::artifact_status))
        .route("/recordings/:key/start", post(handlers::start_artifact))
        .route("/recordings/:key/chunks", post(handlers::append_chunk))
        .route("/recordings/:key/stop", post(handlers::stop_artifact))
        // Screenshots
        .route(
            "/screenshots/:slot",
            get(handlers::get_screenshot).post(handlers::upload_screenshot),
        )
        // Finished artifacts, cache-busted by generation
        .nest_service(&prefix, artifacts)
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
