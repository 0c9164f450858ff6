//! # kawayan-relay
//!
//! Real-time call signaling and presence relay for Kawayan support calls.
//!
//! Two browser peers — a user and a support agent — meet in a named room
//! and exchange WebRTC offer/answer/ICE payloads plus lightweight presence
//! events (camera, screen share, chat) through this relay. The relay never
//! touches media; it forwards control-plane metadata only. Alongside the
//! relay, a persistence-backed call lifecycle tracker feeds the agent
//! dashboard's "who is waiting" queue and the historical call report.
//!
//! ## Architecture
//!
//! ```text
//! Clients (call widget, agent dashboard)
//!     │
//!     ├── REST Handlers (api/)          JWT bearer auth (auth)
//!     ├── Signaling WS (relay/)
//!     │
//!     ├── CallService (service/)
//!     ├── RoomRegistry (domain/)
//!     │
//!     └── SQLite Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod relay;
pub mod service;
