//! WebSocket signaling layer: connection handling and message routing.
//!
//! The signaling endpoint at `/ws` carries room joins, opaque WebRTC
//! negotiation payloads, chat, and presence toggles between the two
//! peers of a support call.

pub mod connection;
pub mod handler;
pub mod messages;
