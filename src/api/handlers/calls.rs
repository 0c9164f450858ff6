//! Call lifecycle handlers: register, unregister, queue, history.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ActiveCallDto, CallHistoryDto, HistoryParams, RegisterCallRequest, RegisterCallResponse,
    UnregisterCallRequest, UnregisterCallResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, RelayError};

/// Mounts the call lifecycle routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calls/register", post(register_call))
        .route("/calls/unregister", post(unregister_call))
        .route("/calls", get(list_active_calls))
        .route("/call-history", get(list_call_history))
}

/// `POST /api/support/calls/register` — Register an active call for the
/// authenticated user.
///
/// # Errors
///
/// Returns [`RelayError`] on invalid input or persistence failure.
#[utoipa::path(
    post,
    path = "/api/support/calls/register",
    tag = "Calls",
    summary = "Register an active support call",
    description = "Registers (or re-registers) an active call for the authenticated user, making it visible to polling agents. The room name defaults to the KawayanSupport-<suffix> convention when omitted.",
    request_body = RegisterCallRequest,
    responses(
        (status = 200, description = "Call registered", body = RegisterCallResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn register_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RegisterCallRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let call = state
        .call_service
        .register_call(&auth.user_id, &auth.email, req.room_name, &req.reason)
        .await?;

    Ok(Json(RegisterCallResponse {
        user_id: call.user_id,
        room_name: call.room_name,
        started_at: call.started_at,
    }))
}

/// `POST /api/support/calls/unregister` — Remove the authenticated user's
/// active call; append history when agent-initiated.
///
/// # Errors
///
/// Returns [`RelayError`] on persistence failure.
#[utoipa::path(
    post,
    path = "/api/support/calls/unregister",
    tag = "Calls",
    summary = "Unregister an active support call",
    description = "Removes the caller's active-call entry. Idempotent: unregistering a call that is already gone succeeds with removed=false. When agentId is supplied the call is appended to history with its computed duration.",
    request_body = UnregisterCallRequest,
    responses(
        (status = 200, description = "Unregister outcome", body = UnregisterCallResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn unregister_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UnregisterCallRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let outcome = state
        .call_service
        .unregister_call(&auth.user_id, req.agent_id.as_deref())
        .await?;

    Ok(Json(UnregisterCallResponse {
        removed: outcome.removed,
        history_id: outcome.history_id,
    }))
}

/// `GET /api/support/calls` — Active-call queue for the agent dashboard.
///
/// # Errors
///
/// Returns [`RelayError::Forbidden`] for non-support callers.
#[utoipa::path(
    get,
    path = "/api/support/calls",
    tag = "Calls",
    summary = "List active support calls",
    description = "Returns every user currently waiting for (or engaged in) a support call. Polled by the agent dashboard.",
    responses(
        (status = 200, description = "Active call queue", body = Vec<ActiveCallDto>),
        (status = 403, description = "Caller is not support or admin", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_active_calls(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, RelayError> {
    auth.require_support()?;

    let calls = state.call_service.active_calls().await?;
    let data: Vec<ActiveCallDto> = calls.into_iter().map(ActiveCallDto::from).collect();
    Ok(Json(data))
}

/// `GET /api/support/call-history` — Completed-call report.
///
/// # Errors
///
/// Returns [`RelayError::Forbidden`] for non-support callers.
#[utoipa::path(
    get,
    path = "/api/support/call-history",
    tag = "Calls",
    summary = "List call history",
    description = "Returns completed calls with durations, most recent first. Restricted to support and admin roles.",
    params(HistoryParams),
    responses(
        (status = 200, description = "Call history", body = Vec<CallHistoryDto>),
        (status = 403, description = "Caller is not support or admin", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_call_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, RelayError> {
    auth.require_support()?;

    let rows = state.call_service.call_history(params.clamped()).await?;
    let data: Vec<CallHistoryDto> = rows.into_iter().map(CallHistoryDto::from).collect();
    Ok(Json(data))
}
