//! Room identity and the support room naming convention.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix shared by every support call room.
pub const SUPPORT_ROOM_PREFIX: &str = "KawayanSupport-";

/// Name of a signaling room.
///
/// Rooms are ephemeral: a `RoomId` is only a rendezvous key, created
/// implicitly by the first `join-room` and dropped when the last member
/// leaves. Not a security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps a raw room name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the room name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Builds the conventional support room name for a user.
///
/// Uses the last four characters of the user id as the suffix so the
/// requesting widget and the agent's join action land on the same name;
/// falls back to four random digits when the id is shorter.
#[must_use]
pub fn support_room_name(user_id: &str) -> RoomId {
    let suffix = user_id
        .len()
        .checked_sub(4)
        .and_then(|start| user_id.get(start..))
        .map_or_else(
            || format!("{:04}", rand::rng().random_range(0..10_000)),
            str::to_string,
        );
    RoomId(format!("{SUPPORT_ROOM_PREFIX}{suffix}"))
}
