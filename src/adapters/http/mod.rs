pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, results_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/segment_image/all_models/", post(routes::segment_all_models))
        .route("/segment_image/:model_key/", post(routes::segment_single))
        .route("/models", get(routes::list_models))
        .route("/health", get(routes::health))
        .nest_service("/results", ServeDir::new(results_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
