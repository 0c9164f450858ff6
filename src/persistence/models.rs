//! Database models for active calls and call history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active-call row from the `active_calls` table.
///
/// At most one row per user; upserted on register, deleted on unregister
/// or by the reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCallRow {
    /// User waiting for (or engaged in) the call.
    pub user_id: String,
    /// User's email, denormalized for the agent dashboard.
    pub user_email: String,
    /// Rendezvous room name (`KawayanSupport-<suffix>`).
    pub room_name: String,
    /// Free-text reason the user gave when requesting the call.
    pub reason: String,
    /// Registration time; duration is computed from this on hangup.
    pub started_at: DateTime<Utc>,
}

/// A completed-call row from the `call_history` table. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Email of the user side of the call.
    pub user_email: String,
    /// Agent that ended the call.
    pub agent_id: Option<String>,
    /// When the call was registered.
    pub started_at: DateTime<Utc>,
    /// Whole seconds between registration and hangup.
    pub duration_seconds: i64,
}
