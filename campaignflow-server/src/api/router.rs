//! Route table.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::state::AppState;

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/generate", post(endpoints::generate::generate))
        .route("/progress", get(endpoints::progress::read))
        .with_state(state)
}
