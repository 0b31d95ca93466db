//! Route definitions for the action endpoints.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Create the router with health check and `/api/{resource}` actions.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/{resource}",
            post(handlers::create)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
