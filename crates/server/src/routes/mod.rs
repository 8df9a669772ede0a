use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod comments;
pub mod health;
pub mod tasks;
pub mod time_entries;

pub fn router(state: AppState) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(tasks::router(&state))
        .with_state(state);

    Router::new()
        .nest("/api", base_routes)
        .layer(CorsLayer::permissive())
}
