//! SQLite implementation of the persistence layer.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::models::{ActiveCallRow, CallHistoryRow};
use crate::error::RelayError;

/// SQLite-backed persistence layer using `sqlx::SqlitePool`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the schema if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn init_schema(&self) -> Result<(), RelayError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS active_calls (
                user_id TEXT PRIMARY KEY,
                user_email TEXT NOT NULL,
                room_name TEXT NOT NULL,
                reason TEXT NOT NULL,
                started_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS call_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_email TEXT NOT NULL,
                agent_id TEXT,
                started_at TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS support_tickets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open'
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or overwrites the active-call row for a user.
    ///
    /// Re-registering resets `started_at`, so the duration of an eventual
    /// history row is measured from the latest registration.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn upsert_active_call(
        &self,
        user_id: &str,
        user_email: &str,
        room_name: &str,
        reason: &str,
        started_at: DateTime<Utc>,
    ) -> Result<(), RelayError> {
        sqlx::query(
            "INSERT INTO active_calls (user_id, user_email, room_name, reason, started_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 user_email = excluded.user_email, \
                 room_name = excluded.room_name, \
                 reason = excluded.reason, \
                 started_at = excluded.started_at",
        )
        .bind(user_id)
        .bind(user_email)
        .bind(room_name)
        .bind(reason)
        .bind(started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches the active-call row for a user, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn get_active_call(&self, user_id: &str) -> Result<Option<ActiveCallRow>, RelayError> {
        let row = sqlx::query_as::<_, (String, String, String, String, DateTime<Utc>)>(
            "SELECT user_id, user_email, room_name, reason, started_at \
             FROM active_calls WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, user_email, room_name, reason, started_at)| ActiveCallRow {
                user_id,
                user_email,
                room_name,
                reason,
                started_at,
            },
        ))
    }

    /// Deletes the active-call row for a user. Returns `true` if a row
    /// existed. Deleting a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn delete_active_call(&self, user_id: &str) -> Result<bool, RelayError> {
        let result = sqlx::query("DELETE FROM active_calls WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists all active calls, oldest registration first.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn list_active_calls(&self) -> Result<Vec<ActiveCallRow>, RelayError> {
        let rows = sqlx::query_as::<_, (String, String, String, String, DateTime<Utc>)>(
            "SELECT user_id, user_email, room_name, reason, started_at \
             FROM active_calls ORDER BY started_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(user_id, user_email, room_name, reason, started_at)| ActiveCallRow {
                    user_id,
                    user_email,
                    room_name,
                    reason,
                    started_at,
                },
            )
            .collect())
    }

    /// Lists active calls registered before `cutoff`, for the
    /// reconciliation sweep.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn list_active_calls_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ActiveCallRow>, RelayError> {
        let rows = sqlx::query_as::<_, (String, String, String, String, DateTime<Utc>)>(
            "SELECT user_id, user_email, room_name, reason, started_at \
             FROM active_calls WHERE started_at < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(user_id, user_email, room_name, reason, started_at)| ActiveCallRow {
                    user_id,
                    user_email,
                    room_name,
                    reason,
                    started_at,
                },
            )
            .collect())
    }

    /// Appends a completed call to the history log.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn insert_call_history(
        &self,
        user_email: &str,
        agent_id: Option<&str>,
        started_at: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<i64, RelayError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO call_history (user_email, agent_id, started_at, duration_seconds) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(user_email)
        .bind(agent_id)
        .bind(started_at)
        .bind(duration_seconds)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Lists call history, most recent first.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn list_call_history(&self, limit: u32) -> Result<Vec<CallHistoryRow>, RelayError> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>, DateTime<Utc>, i64)>(
            "SELECT id, user_email, agent_id, started_at, duration_seconds \
             FROM call_history ORDER BY started_at DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_email, agent_id, started_at, duration_seconds)| CallHistoryRow {
                    id,
                    user_email,
                    agent_id,
                    started_at,
                    duration_seconds,
                },
            )
            .collect())
    }

    /// Marks every open ticket of a user as resolved, returning the number
    /// of tickets affected.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::PersistenceError`] on database failure.
    pub async fn resolve_tickets_for_user(&self, user_id: &str) -> Result<u64, RelayError> {
        let result = sqlx::query(
            "UPDATE support_tickets SET status = 'resolved' \
             WHERE user_id = ? AND status = 'open'",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn memory_store() -> SqliteStore {
        let Ok(pool) = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
        else {
            panic!("failed to open in-memory sqlite");
        };
        let store = SqliteStore::new(pool);
        let Ok(()) = store.init_schema().await else {
            panic!("schema init failed");
        };
        store
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_row() {
        let store = memory_store().await;
        let first = Utc::now() - chrono::Duration::seconds(120);

        let Ok(()) = store
            .upsert_active_call("u1", "a@b.c", "KawayanSupport-0001", "billing", first)
            .await
        else {
            panic!("first upsert failed");
        };
        let later = Utc::now();
        let Ok(()) = store
            .upsert_active_call("u1", "a@b.c", "KawayanSupport-0002", "bug", later)
            .await
        else {
            panic!("second upsert failed");
        };

        let Ok(calls) = store.list_active_calls().await else {
            panic!("list failed");
        };
        assert_eq!(calls.len(), 1);
        let Some(call) = calls.first() else {
            panic!("missing row");
        };
        assert_eq!(call.room_name, "KawayanSupport-0002");
        assert_eq!(call.reason, "bug");
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let store = memory_store().await;
        let Ok(()) = store
            .upsert_active_call("u1", "a@b.c", "KawayanSupport-0001", "billing", Utc::now())
            .await
        else {
            panic!("upsert failed");
        };

        assert_eq!(store.delete_active_call("u1").await.ok(), Some(true));
        assert_eq!(store.delete_active_call("u1").await.ok(), Some(false));
    }

    #[tokio::test]
    async fn history_is_append_only_and_ordered() {
        let store = memory_store().await;
        let old = Utc::now() - chrono::Duration::minutes(10);
        let recent = Utc::now() - chrono::Duration::minutes(1);

        let Ok(_) = store.insert_call_history("a@b.c", Some("agent-1"), old, 300).await else {
            panic!("insert failed");
        };
        let Ok(_) = store.insert_call_history("d@e.f", None, recent, 45).await else {
            panic!("insert failed");
        };

        let Ok(history) = store.list_call_history(50).await else {
            panic!("list failed");
        };
        assert_eq!(history.len(), 2);
        assert_eq!(history.first().map(|h| h.user_email.as_str()), Some("d@e.f"));
        assert_eq!(history.first().and_then(|h| h.agent_id.as_deref()), None);
    }

    #[tokio::test]
    async fn resolve_only_touches_open_tickets_of_that_user() {
        let store = memory_store().await;
        for (user, status) in [("u1", "open"), ("u1", "resolved"), ("u2", "open")] {
            let Ok(_) = sqlx::query(
                "INSERT INTO support_tickets (user_id, subject, status) VALUES (?, 'help', ?)",
            )
            .bind(user)
            .bind(status)
            .execute(&store.pool)
            .await
            else {
                panic!("seed failed");
            };
        }

        assert_eq!(store.resolve_tickets_for_user("u1").await.ok(), Some(1));
        assert_eq!(store.resolve_tickets_for_user("u1").await.ok(), Some(0));
    }

    #[tokio::test]
    async fn stale_listing_respects_cutoff() {
        let store = memory_store().await;
        let old = Utc::now() - chrono::Duration::hours(2);
        let Ok(()) = store
            .upsert_active_call("u1", "a@b.c", "KawayanSupport-old", "stuck", old)
            .await
        else {
            panic!("upsert failed");
        };
        let Ok(()) = store
            .upsert_active_call("u2", "d@e.f", "KawayanSupport-new", "fresh", Utc::now())
            .await
        else {
            panic!("upsert failed");
        };

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        let Ok(stale) = store.list_active_calls_before(cutoff).await else {
            panic!("list failed");
        };
        assert_eq!(stale.len(), 1);
        assert_eq!(stale.first().map(|c| c.user_id.as_str()), Some("u1"));
    }
}
