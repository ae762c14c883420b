mod placement;
mod reviews;
mod sessions;
mod wordlists;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::AppState;

async fn health() -> &'static str {
    "ok"
}

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/reviews", reviews::router())
        .nest("/placement", placement::router())
        .route("/health", get(health))
}
