//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::AuthKeys;
use crate::domain::RoomRegistry;
use crate::service::CallService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Room membership registry for the signaling relay.
    pub registry: Arc<RoomRegistry>,
    /// Call lifecycle tracker.
    pub call_service: Arc<CallService>,
    /// Bearer-token verification keys.
    pub auth: AuthKeys,
}
