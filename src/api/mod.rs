//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All lifecycle endpoints are mounted under `/api/support`.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/support", handlers::routes())
        .merge(handlers::system::routes())
}
