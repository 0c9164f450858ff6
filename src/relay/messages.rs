//! Client-to-server signaling messages.

use serde::Deserialize;

use crate::domain::{ConnectionId, RoomId};

/// Messages a client can send over the signaling socket.
///
/// Tagged with an `event` discriminator using the same wire names the
/// call UI emits (`join-room`, `cam-state`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or implicitly create) the named room.
    JoinRoom {
        /// Target room name.
        room_id: RoomId,
    },
    /// Forward an opaque WebRTC payload to one peer.
    Signal {
        /// Addressed recipient connection.
        to: ConnectionId,
        /// SDP offer/answer or ICE candidate; not interpreted.
        signal: serde_json::Value,
    },
    /// Send a chat message to the room.
    Message {
        /// Room to broadcast into.
        room_id: RoomId,
        /// Chat text.
        text: String,
        /// Display name of the sender.
        sender: String,
    },
    /// Announce a camera on/off toggle.
    CamState {
        /// Room to broadcast into.
        room_id: RoomId,
        /// New camera state.
        active: bool,
    },
    /// Announce a screen-share on/off toggle.
    ScreenState {
        /// Room to broadcast into.
        room_id: RoomId,
        /// New screen-share state.
        active: bool,
    },
}
