//! WebSocket connection loop for the signaling relay.
//!
//! Handles the read/write loop for a single signaling connection,
//! dispatching incoming client events to the room registry and draining
//! the connection's outbound event channel back to the socket.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::ClientEvent;
use crate::domain::{ConnectionId, RoomRegistry, ServerEvent};
use crate::error::RelayError;

/// Runs the read/write loop for a single signaling connection.
///
/// - Incoming text frames are parsed as [`ClientEvent`]s and dispatched.
/// - Events routed to this connection by the registry are serialized and
///   written back to the socket.
/// - On close or socket error the connection is removed from the registry,
///   which emits `peer-left` to its room.
pub async fn run_connection(socket: WebSocket, registry: Arc<RoomRegistry>) {
    let id = ConnectionId::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    registry.register(id, event_tx).await;
    tracing::debug!(connection_id = %id, "signaling connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&registry, id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Event routed to this connection by the registry
            event = event_rx.recv() => {
                match event {
                    Some(server_event) => {
                        // Never emit an empty frame for an unserializable event.
                        let Ok(json) = serde_json::to_string(&server_event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    registry.remove(id).await;
    tracing::debug!(connection_id = %id, "signaling connection closed");
}

/// Parses one text frame and dispatches it; malformed frames get an
/// `error` event back instead of closing the connection.
pub(crate) async fn handle_text(registry: &RoomRegistry, id: ConnectionId, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => dispatch(registry, id, event).await,
        Err(e) => {
            tracing::debug!(connection_id = %id, error = %e, "malformed client event");
            registry
                .send(id, ServerEvent::Error {
                    code: RelayError::InvalidRequest(String::new()).error_code(),
                    message: "malformed JSON".to_string(),
                })
                .await;
        }
    }
}

/// Routes one parsed client event through the registry.
pub(crate) async fn dispatch(registry: &RoomRegistry, id: ConnectionId, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            if let Err(e) = registry.join(id, room_id).await {
                registry
                    .send(id, ServerEvent::Error {
                        code: e.error_code(),
                        message: e.to_string(),
                    })
                    .await;
            }
        }
        ClientEvent::Signal { to, signal } => {
            registry.relay_signal(id, to, signal).await;
        }
        ClientEvent::Message {
            room_id,
            text,
            sender,
        } => {
            registry
                .broadcast(&room_id, id, ServerEvent::Message {
                    text,
                    sender,
                    timestamp: Utc::now(),
                })
                .await;
        }
        ClientEvent::CamState { room_id, active } => {
            registry
                .broadcast(&room_id, id, ServerEvent::CamState { active })
                .await;
        }
        ClientEvent::ScreenState { room_id, active } => {
            registry
                .broadcast(&room_id, id, ServerEvent::ScreenState { active })
                .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::domain::RoomId;

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

    #[tokio::test]
    async fn malformed_frame_yields_error_event() {
        let registry = RoomRegistry::new(2);
        let (id, mut rx) = connect(&registry).await;

        handle_text(&registry, id, "not json").await;

        let events = drain(&mut rx);
        assert!(matches!(
            events.first(),
            Some(ServerEvent::Error { code: 1001, .. })
        ));
    }

    #[tokio::test]
    async fn join_on_full_room_yields_error_event() {
        let registry = RoomRegistry::new(1);
        let (a, _rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-solo");
        let Ok(()) = registry.join(a, room).await else {
            panic!("join failed");
        };

        handle_text(
            &registry,
            b,
            r#"{"event":"join-room","room_id":"KawayanSupport-solo"}"#,
        )
        .await;

        let events = drain(&mut rx_b);
        assert!(matches!(
            events.first(),
            Some(ServerEvent::Error { code: 2101, .. })
        ));
    }

    #[tokio::test]
    async fn chat_message_is_stamped_and_broadcast() {
        let registry = RoomRegistry::new(2);
        let (a, _rx_a) = connect(&registry).await;
        let (b, mut rx_b) = connect(&registry).await;
        let room = RoomId::from("KawayanSupport-chat");
        let Ok(()) = registry.join(a, room.clone()).await else {
            panic!("join failed");
        };
        let Ok(()) = registry.join(b, room).await else {
            panic!("join failed");
        };
        drain(&mut rx_b);

        dispatch(&registry, a, ClientEvent::Message {
            room_id: RoomId::from("KawayanSupport-chat"),
            text: "hello".to_string(),
            sender: "Maria".to_string(),
        })
        .await;

        let events = drain(&mut rx_b);
        let Some(ServerEvent::Message { text, sender, .. }) = events.first() else {
            panic!("expected chat message, got {events:?}");
        };
        assert_eq!(text, "hello");
        assert_eq!(sender, "Maria");
    }
}
