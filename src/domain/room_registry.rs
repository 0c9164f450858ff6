//! Room membership registry and broadcast routing.
//!
//! [`RoomRegistry`] is the only server-side shared mutable state of the
//! relay. It maps room names to member sets and holds a send handle for
//! every live connection, so joins, targeted signal forwards, and room
//! broadcasts all go through one place.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;

use super::events::ServerEvent;
use super::{ConnectionId, RoomId};
use crate::error::RelayError;

/// Per-connection bookkeeping: the outbound event channel and a
/// non-owning back-reference to the room the connection joined.
#[derive(Debug)]
struct Peer {
    sender: UnboundedSender<ServerEvent>,
    room: Option<RoomId>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    peers: HashMap<ConnectionId, Peer>,
}

/// Central store for room memberships and peer send handles.
///
/// Constructed once at startup and shared via [`crate::app_state::AppState`].
/// Mutated only by `join`, `remove`, and the implicit auto-leave on
/// re-join, so membership and peer state can never drift apart.
///
/// # Concurrency
///
/// A single `RwLock` guards both maps. Relay operations are short
/// (hash map updates plus non-blocking channel sends), so contention is
/// not a concern at support-call scale.
///
/// # Delivery semantics
///
/// All sends are fire-and-forget: a closed or missing receiver drops the
/// event silently, matching the transport's own best-effort guarantees.
#[derive(Debug)]
pub struct RoomRegistry {
    inner: RwLock<RegistryInner>,
    capacity: usize,
}

impl RoomRegistry {
    /// Creates an empty registry enforcing the given room capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            capacity,
        }
    }

    /// Registers a new connection with its outbound event channel.
    ///
    /// Called once at WebSocket upgrade, before any `join-room`.
    pub async fn register(&self, id: ConnectionId, sender: UnboundedSender<ServerEvent>) {
        let mut inner = self.inner.write().await;
        inner.peers.insert(id, Peer { sender, room: None });
    }

    /// Adds a connection to a room.
    ///
    /// - Re-joining the room the connection is already in is a no-op.
    /// - Joining a different room auto-leaves the current one first,
    ///   emitting `peer-left` there.
    /// - Every *other* member of the target room receives `user-connected`
    ///   naming the joiner, and the joiner receives one `user-connected`
    ///   per existing member, so both sides can negotiate. The joiner also
    ///   gets a `joined` acknowledgement carrying its own connection id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RoomFull`] when the room already holds the
    /// configured maximum of members; membership is left unchanged.
    pub async fn join(&self, id: ConnectionId, room_id: RoomId) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;

        let current = inner.peers.get(&id).and_then(|p| p.room.clone());
        if current.as_ref() == Some(&room_id) {
            // Duplicate join: idempotent, just re-ack.
            send_to(&inner, id, ServerEvent::Joined {
                connection_id: id,
                room_id,
            });
            return Ok(());
        }

        // Capacity is checked before the auto-leave: a rejected join must
        // not touch the connection's current room.
        if inner.rooms.get(&room_id).map_or(0, HashSet::len) >= self.capacity {
            return Err(RelayError::RoomFull(room_id.to_string()));
        }

        if let Some(current) = current {
            leave_room(&mut inner, id, &current);
        }
        inner.rooms.entry(room_id.clone()).or_default().insert(id);

        let others: Vec<ConnectionId> = inner
            .rooms
            .get(&room_id)
            .map(|m| m.iter().copied().filter(|m| *m != id).collect())
            .unwrap_or_default();
        for member in others {
            send_to(&inner, member, ServerEvent::UserConnected { connection_id: id });
            send_to(&inner, id, ServerEvent::UserConnected {
                connection_id: member,
            });
        }
        if let Some(peer) = inner.peers.get_mut(&id) {
            peer.room = Some(room_id.clone());
        }
        send_to(&inner, id, ServerEvent::Joined {
            connection_id: id,
            room_id,
        });
        Ok(())
    }

    /// Forwards an opaque signal payload to exactly the addressed
    /// connection. If the target is gone, the event is dropped.
    pub async fn relay_signal(
        &self,
        from: ConnectionId,
        to: ConnectionId,
        signal: serde_json::Value,
    ) {
        let inner = self.inner.read().await;
        send_to(&inner, to, ServerEvent::Signal { to, from, signal });
    }

    /// Broadcasts an event to every member of `room_id` except `sender_id`.
    pub async fn broadcast(&self, room_id: &RoomId, sender_id: ConnectionId, event: ServerEvent) {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room_id) else {
            return;
        };
        for member in members.iter().copied().filter(|m| *m != sender_id) {
            send_to(&inner, member, event.clone());
        }
    }

    /// Sends an event to a single connection (relay-level errors).
    pub async fn send(&self, id: ConnectionId, event: ServerEvent) {
        let inner = self.inner.read().await;
        send_to(&inner, id, event);
    }

    /// Removes a connection entirely, leaving its room (if any) and
    /// emitting `peer-left` to the remaining members. Triggered by
    /// transport disconnect; idempotent.
    pub async fn remove(&self, id: ConnectionId) {
        let mut inner = self.inner.write().await;
        if let Some(room_id) = inner.peers.get(&id).and_then(|p| p.room.clone()) {
            leave_room(&mut inner, id, &room_id);
        }
        inner.peers.remove(&id);
    }

    /// Returns `true` if the named room currently has members.
    ///
    /// Used by the lifecycle sweep to distinguish live calls from
    /// abandoned active-call rows.
    pub async fn is_room_live(&self, room_name: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .rooms
            .get(&RoomId::from(room_name))
            .is_some_and(|m| !m.is_empty())
    }

    /// Returns the number of members in a room (0 if absent).
    pub async fn room_len(&self, room_id: &RoomId) -> usize {
        let inner = self.inner.read().await;
        inner.rooms.get(room_id).map_or(0, HashSet::len)
    }

    /// Returns the number of active rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    /// Returns the number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.peers.len()
    }
}

/// Removes `id` from `room_id`, notifies remaining members, and drops the
/// room once empty. Caller holds the write lock.
fn leave_room(inner: &mut RegistryInner, id: ConnectionId, room_id: &RoomId) {
    let remaining: Vec<ConnectionId> = match inner.rooms.get_mut(room_id) {
        Some(members) => {
            members.remove(&id);
            members.iter().copied().collect()
        }
        None => Vec::new(),
    };
    if remaining.is_empty() {
        inner.rooms.remove(room_id);
    }
    if let Some(peer) = inner.peers.get_mut(&id) {
        peer.room = None;
    }
    for member in remaining {
        send_to(inner, member, ServerEvent::PeerLeft { connection_id: id });
    }
}

/// Fire-and-forget delivery to one peer.
fn send_to(inner: &RegistryInner, id: ConnectionId, event: ServerEvent) {
    if let Some(peer) = inner.peers.get(&id) {
        let _ = peer.sender.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    async fn connect(
        registry: &RoomRegistry,
    ) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(id, tx).await;
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn user_connected_peers(events: &[ServerEvent]) -> Vec<ConnectionId> {
        events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::UserConnected { connection_id } => Some(*connection_id),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn both_peers_learn_of_exactly_the_other() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-ab12");

        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("first join failed");
        };
        let Ok(()) = registry.join(b, room).await else {
            panic!("second join failed");
        };

        // Each side sees exactly one user-connected naming the other,
        // never itself.
        assert_eq!(user_connected_peers(&drain(&mut rx_a)), vec![b]);
        assert_eq!(user_connected_peers(&drain(&mut rx_b)), vec![a]);
    }

    #[tokio::test]
    async fn duplicate_join_is_idempotent() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-0001");

        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("duplicate join failed");
        };

        assert_eq!(registry.room_len(&room).await, 1);
        let acks = drain(&mut rx_a)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::Joined { .. }))
            .count();
        assert_eq!(acks, 2);
    }

    #[tokio::test]
    async fn full_room_rejects_third_join() {
        let registry = RoomRegistry::new(2);
        let (a, _rx_a) = connect(&registry).await;
        let (b, _rx_b) = connect(&registry).await;
        let (c, _rx_c) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-full");

        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join a failed");
        };
        let Ok(()) = registry.join(b, room.clone()).await else {
            panic!("join b failed");
        };

        let result = registry.join(c, room.clone()).await;
        assert!(matches!(result, Err(RelayError::RoomFull(_))));
        assert_eq!(registry.room_len(&room).await, 2);
    }

    #[tokio::test]
    async fn rejected_join_of_full_room_keeps_current_membership() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        let (c, _rx_c) = connect(&registry).await;
        let (b1, _rx_b1) = connect(&registry).await;
        let (b2, _rx_b2) = connect(&registry).await;
        let home = RoomId::from("KawayanSupport-home");
        let other = RoomId::from("KawayanSupport-busy");
        for (peer, room) in [(a, &home), (c, &home), (b1, &other), (b2, &other)] {
            let Ok(()) = registry.join(peer, room.clone()).await else {
                panic!("setup join failed");
            };
        }
        drain(&mut rx_a);

        let result = registry.join(c, other.clone()).await;

        assert!(matches!(result, Err(RelayError::RoomFull(_))));
        // c stays in its home room and its peer sees no spurious peer-left.
        assert_eq!(registry.room_len(&home).await, 2);
        assert_eq!(registry.room_len(&other).await, 2);
        assert!(
            drain(&mut rx_a)
                .iter()
                .all(|e| !matches!(e, ServerEvent::PeerLeft { .. }))
        );
    }

    #[tokio::test]
    async fn rejoining_other_room_auto_leaves_first() {
        let registry = RoomRegistry::new(2);
        let (a, _rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let first = RoomId::from("KawayanSupport-one");
        let second = RoomId::from("KawayanSupport-two");

        let Ok(()) = registry.join(a, first.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(b, first.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(a, second.clone()).await else {
            panic!("re-join failed");
        };

        assert_eq!(registry.room_len(&first).await, 1);
        assert_eq!(registry.room_len(&second).await, 1);
        assert!(
            drain(&mut rx_b)
                .iter()
                .any(|e| *e == ServerEvent::PeerLeft { connection_id: a })
        );
    }

    #[tokio::test]
    async fn signal_reaches_only_addressed_connection() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-sig");
        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(b, room).await else {
            panic!("join failed");
        };
        drain(&mut rx_a);
        drain(&mut rx_b);

        let payload = serde_json::json!({"type": "offer", "sdp": "v=0"});
        registry.relay_signal(a, b, payload.clone()).await;

        assert!(drain(&mut rx_a).is_empty());
        let b_events = drain(&mut rx_b);
        assert_eq!(b_events, vec![ServerEvent::Signal {
            to: b,
            from: a,
            signal: payload,
        }]);
    }

    #[tokio::test]
    async fn signal_to_missing_connection_is_dropped() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        registry
            .relay_signal(a, ConnectionId::new(), serde_json::json!(null))
            .await;
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let registry = RoomRegistry::new(2);
        let (a, mut rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-cam");
        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(b, room.clone()).await else {
            panic!("join failed");
        };
        drain(&mut rx_a);
        drain(&mut rx_b);

        registry
            .broadcast(&room, a, ServerEvent::CamState { active: false })
            .await;

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b), vec![ServerEvent::CamState {
            active: false
        }]);
    }

    #[tokio::test]
    async fn remove_emits_peer_left_once_and_drops_empty_room() {
        let registry = RoomRegistry::new(2);
        let (a, _rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-bye");
        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(b, room.clone()).await else {
            panic!("join failed");
        };
        drain(&mut rx_b);

        registry.remove(a).await;
        registry.remove(a).await; // double disconnect is a no-op

        let left: Vec<_> = drain(&mut rx_b)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::PeerLeft { .. }))
            .collect();
        assert_eq!(left, vec![ServerEvent::PeerLeft { connection_id: a }]);

        registry.remove(b).await;
        assert_eq!(registry.room_count().await, 0);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn is_room_live_tracks_membership() {
        let registry = RoomRegistry::new(2);
        let (a, _rx_a) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-live");

        assert!(!registry.is_room_live("KawayanSupport-live").await);
        let Ok(()) = registry.join(a, room).await else {
            panic!("join failed");
        };
        assert!(registry.is_room_live("KawayanSupport-live").await);
        registry.remove(a).await;
        assert!(!registry.is_room_live("KawayanSupport-live").await);
    }
}
