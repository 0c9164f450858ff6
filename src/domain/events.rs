//! Server-to-client signaling events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ConnectionId, RoomId};

/// Events the relay pushes to connected clients.
///
/// Serialized as JSON with an `event` discriminator, matching the wire
/// names the call UI listens for (`user-connected`, `peer-left`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Acknowledges a `join-room`, telling the client its own connection
    /// id so it can address signal envelopes.
    Joined {
        /// The joining client's connection id.
        connection_id: ConnectionId,
        /// The room that was joined.
        room_id: RoomId,
    },
    /// A new peer joined the recipient's room; recipients should initiate
    /// an offer toward it.
    UserConnected {
        /// Connection id of the peer that just joined.
        connection_id: ConnectionId,
    },
    /// Forwarded WebRTC negotiation payload (SDP offer/answer or ICE
    /// candidate). The `signal` body is opaque to the relay.
    Signal {
        /// Addressed recipient.
        to: ConnectionId,
        /// Originating connection.
        from: ConnectionId,
        /// Opaque negotiation payload.
        signal: serde_json::Value,
    },
    /// Relayed chat message.
    Message {
        /// Chat text.
        text: String,
        /// Display name of the sender.
        sender: String,
        /// Server-side receipt time.
        timestamp: DateTime<Utc>,
    },
    /// Peer toggled its camera.
    CamState {
        /// Whether the peer's camera is now on.
        active: bool,
    },
    /// Peer toggled screen sharing.
    ScreenState {
        /// Whether the peer is now sharing its screen.
        active: bool,
    },
    /// A room peer disconnected; the call UI should tear down.
    PeerLeft {
        /// Connection id of the departed peer.
        connection_id: ConnectionId,
    },
    /// Relay-level error (malformed message, full room, ...).
    Error {
        /// Numeric error code (same ranges as REST errors).
        code: u32,
        /// Human-readable message.
        message: String,
    },
}
