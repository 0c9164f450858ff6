//! Call lifecycle DTOs.
//!
//! Wire names are camelCase to match the contract the call widget and
//! agent dashboard already speak (`roomName`, `agentId`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::persistence::{ActiveCallRow, CallHistoryRow};

/// Request body for `POST /api/support/calls/register`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCallRequest {
    /// Rendezvous room name. Derived from the user id when omitted.
    #[serde(default)]
    pub room_name: Option<String>,
    /// Why the user is requesting a call.
    #[serde(default)]
    pub reason: String,
}

/// Response body for `POST /api/support/calls/register`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCallResponse {
    /// User the call was registered for.
    pub user_id: String,
    /// Room name both sides should join.
    pub room_name: String,
    /// Registration time.
    pub started_at: DateTime<Utc>,
}

/// Request body for `POST /api/support/calls/unregister`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterCallRequest {
    /// Present on agent-initiated hangups; triggers the history append.
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Response body for `POST /api/support/calls/unregister`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterCallResponse {
    /// Whether an active call was actually removed (`false` on repeat
    /// hangups).
    pub removed: bool,
    /// Id of the appended history row, when agent-initiated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<i64>,
}

/// Request body for `POST /api/support/tickets/resolve-user`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTicketsRequest {
    /// User whose open tickets should be resolved.
    pub user_id: String,
}

/// Response body for `POST /api/support/tickets/resolve-user`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTicketsResponse {
    /// Number of tickets transitioned to resolved.
    pub resolved: u64,
}

/// One active call, as shown in the agent dashboard queue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCallDto {
    /// Waiting user's id.
    pub user_id: String,
    /// Waiting user's email.
    pub user_email: String,
    /// Room the agent should join.
    pub room_name: String,
    /// Stated reason for the call.
    pub reason: String,
    /// When the user started waiting.
    pub started_at: DateTime<Utc>,
}

impl From<ActiveCallRow> for ActiveCallDto {
    fn from(row: ActiveCallRow) -> Self {
        Self {
            user_id: row.user_id,
            user_email: row.user_email,
            room_name: row.room_name,
            reason: row.reason,
            started_at: row.started_at,
        }
    }
}

/// One completed call in the history report.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallHistoryDto {
    /// Row id.
    pub id: i64,
    /// Email of the user side of the call.
    pub user_email: String,
    /// Agent that ended the call, if agent-initiated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// When the call started.
    pub started_at: DateTime<Utc>,
    /// Call duration in whole seconds.
    pub duration_seconds: i64,
}

impl From<CallHistoryRow> for CallHistoryDto {
    fn from(row: CallHistoryRow) -> Self {
        Self {
            id: row.id,
            user_email: row.user_email,
            agent_id: row.agent_id,
            started_at: row.started_at,
            duration_seconds: row.duration_seconds,
        }
    }
}

/// Query parameters for `GET /api/support/call-history`.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct HistoryParams {
    /// Maximum rows to return (default 100, max 1000).
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    100
}

impl HistoryParams {
    /// Clamps `limit` to the allowed maximum.
    #[must_use]
    pub fn clamped(&self) -> u32 {
        self.limit.clamp(1, 1000)
    }
}
