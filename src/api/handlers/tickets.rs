//! Ticket resolution handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ResolveTicketsRequest, ResolveTicketsResponse};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, RelayError};

/// Mounts the ticket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tickets/resolve-user", post(resolve_user_tickets))
}

/// `POST /api/support/tickets/resolve-user` — Resolve a user's open
/// tickets after a call concludes.
///
/// # Errors
///
/// Returns [`RelayError::Forbidden`] for non-support callers.
#[utoipa::path(
    post,
    path = "/api/support/tickets/resolve-user",
    tag = "Tickets",
    summary = "Resolve a user's open tickets",
    description = "Marks every open support ticket of the given user as resolved. Called by the agent side when a call concludes.",
    request_body = ResolveTicketsRequest,
    responses(
        (status = 200, description = "Resolution count", body = ResolveTicketsResponse),
        (status = 403, description = "Caller is not support or admin", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn resolve_user_tickets(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ResolveTicketsRequest>,
) -> Result<impl IntoResponse, RelayError> {
    auth.require_support()?;

    if req.user_id.is_empty() {
        return Err(RelayError::InvalidRequest("empty user id".to_string()));
    }
    let resolved = state.call_service.resolve_tickets(&req.user_id).await?;
    Ok(Json(ResolveTicketsResponse { resolved }))
}
