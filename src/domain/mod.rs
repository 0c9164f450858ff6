//! Domain layer: connection and room identity, signaling events, and the
//! room membership registry.

pub mod connection_id;
pub mod events;
pub mod room;
pub mod room_registry;

pub use connection_id::ConnectionId;
pub use events::ServerEvent;
pub use room::{RoomId, support_room_name};
pub use room_registry::RoomRegistry;
