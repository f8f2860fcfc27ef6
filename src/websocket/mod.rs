//! WebSocket module for Amora
//!
//! Provides the real-time conversation relay:
//! - /ws - message, typing and read-receipt exchange between matched users

pub mod protocol;
pub mod registry;
pub mod session;

pub use registry::ConnectionRegistry;

use std::sync::Arc;

use axum::{
    extract::ws::WebSocketUpgrade, response::IntoResponse, routing::get, Extension, Router,
};

use amora_core::ChatStore;

use crate::middleware::auth::AuthedUser;

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/ws", get(relay_handler))
}

/// WebSocket upgrade handler
///
/// Authentication happens before the upgrade, so an invalid token is
/// rejected with a plain 401 instead of a doomed socket.
pub async fn relay_handler(
    AuthedUser(user_id): AuthedUser,
    ws: WebSocketUpgrade,
    Extension(store): Extension<Arc<ChatStore>>,
    Extension(registry): Extension<Arc<ConnectionRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::handle_socket(socket, user_id, store, registry))
}
