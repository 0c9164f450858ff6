//! Persistence layer: SQLite-backed active calls, call history, and
//! support tickets.

pub mod models;
pub mod sqlite;

pub use models::{ActiveCallRow, CallHistoryRow};
pub use sqlite::SqliteStore;
