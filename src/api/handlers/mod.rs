//! REST endpoint handlers organized by resource.

pub mod calls;
pub mod system;
pub mod tickets;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/support`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(calls::routes()).merge(tickets::routes())
}
