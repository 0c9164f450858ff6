//! Call lifecycle tracker: active-call registration, history, ticket
//! resolution, and the stale-call reconciliation sweep.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::{RoomRegistry, support_room_name};
use crate::error::RelayError;
use crate::persistence::{ActiveCallRow, CallHistoryRow, SqliteStore};

/// Outcome of an unregister request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterOutcome {
    /// Whether an active-call row was actually removed. `false` means the
    /// call was already unregistered (idempotent no-op).
    pub removed: bool,
    /// History row id when the hangup was agent-initiated.
    pub history_id: Option<i64>,
}

/// Orchestration layer for the call lifecycle.
///
/// Owns the [`SqliteStore`] for durable state and a reference to the
/// [`RoomRegistry`] so the reconciliation sweep can tell live calls from
/// abandoned registrations.
#[derive(Debug, Clone)]
pub struct CallService {
    store: SqliteStore,
    registry: Arc<RoomRegistry>,
    active_call_ttl: Duration,
}

impl CallService {
    /// Creates a new `CallService`.
    #[must_use]
    pub fn new(store: SqliteStore, registry: Arc<RoomRegistry>, active_call_ttl_secs: u64) -> Self {
        Self {
            store,
            registry,
            active_call_ttl: Duration::seconds(active_call_ttl_secs.min(i64::MAX as u64) as i64),
        }
    }

    /// Registers (or re-registers) an active call for a user.
    ///
    /// When the caller supplies no room name, the conventional
    /// `KawayanSupport-<suffix>` name is derived from the user id.
    /// Re-registration overwrites the existing row and resets its clock.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on validation or persistence failure.
    pub async fn register_call(
        &self,
        user_id: &str,
        user_email: &str,
        room_name: Option<String>,
        reason: &str,
    ) -> Result<ActiveCallRow, RelayError> {
        if user_id.is_empty() {
            return Err(RelayError::InvalidRequest("empty user id".to_string()));
        }
        let room_name = match room_name.filter(|r| !r.is_empty()) {
            Some(name) => name,
            None => support_room_name(user_id).to_string(),
        };
        let started_at = Utc::now();

        self.store
            .upsert_active_call(user_id, user_email, &room_name, reason, started_at)
            .await?;

        tracing::info!(user_id, room_name, reason, "active call registered");
        Ok(ActiveCallRow {
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            room_name,
            reason: reason.to_string(),
            started_at,
        })
    }

    /// Removes the active-call row for a user.
    ///
    /// When `agent_id` is present (agent-initiated hangup) the call is
    /// additionally appended to history with
    /// `duration_seconds = floor(now - started_at)`. Unregistering a user
    /// with no active call is a no-op, so double hangups and client
    /// retries are safe.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on persistence failure.
    pub async fn unregister_call(
        &self,
        user_id: &str,
        agent_id: Option<&str>,
    ) -> Result<UnregisterOutcome, RelayError> {
        let Some(call) = self.store.get_active_call(user_id).await? else {
            return Ok(UnregisterOutcome {
                removed: false,
                history_id: None,
            });
        };

        let history_id = match agent_id {
            Some(agent) => {
                let duration_seconds = (Utc::now() - call.started_at).num_seconds().max(0);
                let id = self
                    .store
                    .insert_call_history(
                        &call.user_email,
                        Some(agent),
                        call.started_at,
                        duration_seconds,
                    )
                    .await?;
                tracing::info!(user_id, agent, duration_seconds, "call ended by agent");
                Some(id)
            }
            None => {
                tracing::info!(user_id, "call unregistered");
                None
            }
        };

        let removed = self.store.delete_active_call(user_id).await?;
        Ok(UnregisterOutcome {
            removed,
            history_id,
        })
    }

    /// Marks the user's open support tickets resolved. Business rule
    /// coupling calls to tickets: a concluded call resolves the tickets
    /// that prompted it.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on persistence failure.
    pub async fn resolve_tickets(&self, user_id: &str) -> Result<u64, RelayError> {
        let resolved = self.store.resolve_tickets_for_user(user_id).await?;
        if resolved > 0 {
            tracing::info!(user_id, resolved, "tickets resolved after call");
        }
        Ok(resolved)
    }

    /// Lists all active calls for the agent dashboard.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on persistence failure.
    pub async fn active_calls(&self) -> Result<Vec<ActiveCallRow>, RelayError> {
        self.store.list_active_calls().await
    }

    /// Lists call history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on persistence failure.
    pub async fn call_history(&self, limit: u32) -> Result<Vec<CallHistoryRow>, RelayError> {
        self.store.list_call_history(limit).await
    }

    /// Reconciliation sweep: deletes active-call rows older than the TTL
    /// whose room has no live members. Covers the original fire-and-forget
    /// cleanup gap where a failed unregister left a ghost queue entry.
    ///
    /// Returns the number of expired rows.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] on persistence failure.
    pub async fn sweep_stale_calls(&self) -> Result<u64, RelayError> {
        let cutoff = Utc::now() - self.active_call_ttl;
        let stale = self.store.list_active_calls_before(cutoff).await?;

        let mut expired = 0_u64;
        for call in stale {
            if self.registry.is_room_live(&call.room_name).await {
                continue;
            }
            if self.store.delete_active_call(&call.user_id).await? {
                tracing::warn!(
                    user_id = call.user_id,
                    room_name = call.room_name,
                    "expired abandoned active call"
                );
                expired += 1;
            }
        }
        Ok(expired)
    }
}

/// Runs the reconciliation sweep on a fixed interval until the process
/// exits. Spawned once at startup.
pub async fn run_sweep(service: Arc<CallService>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        match service.sweep_stale_calls().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(expired = n, "sweep expired stale active calls"),
            Err(e) => tracing::error!(error = %e, "sweep failed"),
        }
    }
}
