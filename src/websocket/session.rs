//! Per-connection relay session.
//!
//! One task per socket multiplexes inbound client frames with outbound
//! frames queued by any session through the registry. Inbound frames are
//! handled in arrival order before the next is read, so two messages from
//! the same sender reach the counterpart in send order. Outbound writes
//! all funnel through the session's mpsc queue.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use amora_core::types::{Message, MessageType};
use amora_core::{advisory, ChatStore};

use super::protocol::{ClientFrame, ServerFrame};
use super::registry::{ConnectionHandle, ConnectionRegistry};

/// Drive one upgraded socket for an authenticated user.
pub async fn handle_socket(
    socket: WebSocket,
    user_id: Uuid,
    store: Arc<ChatStore>,
    registry: Arc<ConnectionRegistry>,
) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // Everything written to this socket goes through the outbound queue,
    // including frames pushed by the counterpart's session.
    let (tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerFrame>();

    registry
        .register(user_id, ConnectionHandle::new(conn_id, tx.clone()))
        .await;
    let active = registry.connection_count().await;
    info!(
        %user_id,
        %conn_id,
        active,
        "websocket connected"
    );

    // Acknowledge registration straight away.
    let _ = tx.send(ServerFrame::Connect { user_id });

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Disconnect) => {
                                info!(%user_id, %conn_id, "client disconnected");
                                break;
                            }
                            Ok(frame) => {
                                handle_frame(frame, user_id, &tx, &store, &registry).await;
                            }
                            // Malformed frames are dropped; the socket stays open.
                            Err(err) => {
                                debug!(%user_id, error = %err, "dropping undecodable frame");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!(%user_id, %conn_id, "websocket closed by client");
                        break;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sender.send(WsMessage::Pong(data)).await;
                    }
                    Some(Err(err)) => {
                        error!(%user_id, %conn_id, error = %err, "websocket transport error");
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(frame) => match serde_json::to_string(&frame) {
                        Ok(json) => {
                            if sender.send(WsMessage::Text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(error = %err, "failed to encode outbound frame"),
                    },
                    None => break,
                }
            }
        }
    }

    // Guarded removal: if this user already reconnected, the newer
    // registration stays.
    registry.remove(user_id, conn_id).await;
    info!(%user_id, %conn_id, "websocket session ended");
}

/// Dispatch one decoded inbound frame.
async fn handle_frame(
    frame: ClientFrame,
    user_id: Uuid,
    tx: &mpsc::UnboundedSender<ServerFrame>,
    store: &Arc<ChatStore>,
    registry: &Arc<ConnectionRegistry>,
) {
    match frame {
        ClientFrame::Connect => {
            // Clients may probe after the handshake; re-send the ack.
            let _ = tx.send(ServerFrame::Connect { user_id });
        }
        ClientFrame::Message {
            conversation_id,
            content,
            message_type,
        } => {
            handle_message(user_id, conversation_id, content, message_type, store, registry)
                .await;
        }
        ClientFrame::Typing {
            conversation_id,
            is_typing,
        } => {
            handle_typing(user_id, conversation_id, is_typing, store, registry).await;
        }
        ClientFrame::Read {
            conversation_id,
            message_ids,
        } => {
            handle_read(user_id, conversation_id, message_ids, store, registry).await;
        }
        // Ends the loop before dispatch.
        ClientFrame::Disconnect => {}
    }
}

/// Relay a chat message: persist it, fan it out, advance delivery status.
///
/// Invalid frames (empty content, unknown conversation, sender not a
/// participant) are dropped without a reply, and an unknown conversation
/// is indistinguishable from a foreign one.
async fn handle_message(
    sender_id: Uuid,
    conversation_id: Uuid,
    content: String,
    message_type: MessageType,
    store: &Arc<ChatStore>,
    registry: &Arc<ConnectionRegistry>,
) {
    if content.is_empty() {
        return;
    }

    let Some(counterpart_id) = resolve_counterpart(store, conversation_id, sender_id).await
    else {
        return;
    };

    let message = Message::new(conversation_id, sender_id, content, message_type);
    if let Err(err) = store.insert_message(&message).await {
        warn!(%conversation_id, error = %err, "failed to persist message");
        return;
    }

    advisory(
        "touch_last_message",
        store
            .touch_last_message(conversation_id, message.created_at)
            .await,
    );

    // Memory evolves off the hot path; its failures never block delivery.
    spawn_memory_update(
        store.clone(),
        conversation_id,
        sender_id,
        counterpart_id,
        message.content.clone(),
    );

    // Echo to the sender's registered connection for client consistency.
    if let Some(handle) = registry.lookup(sender_id).await {
        let _ = handle.tx.send(ServerFrame::Message(message.clone()));
    }

    // Push to the counterpart and record delivery. An offline counterpart
    // leaves the message at sent until they pull and read it later.
    if let Some(handle) = registry.lookup(counterpart_id).await {
        if handle.tx.send(ServerFrame::Message(message.clone())).is_ok() {
            advisory("mark_delivered", store.mark_delivered(message.id).await);
        }
    }
}

/// Forward a typing indicator to the counterpart. Nothing is persisted.
async fn handle_typing(
    sender_id: Uuid,
    conversation_id: Uuid,
    is_typing: bool,
    store: &Arc<ChatStore>,
    registry: &Arc<ConnectionRegistry>,
) {
    let Some(counterpart_id) = resolve_counterpart(store, conversation_id, sender_id).await
    else {
        return;
    };

    if let Some(handle) = registry.lookup(counterpart_id).await {
        let _ = handle.tx.send(ServerFrame::Typing {
            conversation_id,
            is_typing,
        });
    }
}

/// Mark received messages read and notify the counterpart.
///
/// The store update itself excludes anything the reader sent, so a client
/// cannot mark its own messages read through this path.
async fn handle_read(
    reader_id: Uuid,
    conversation_id: Uuid,
    message_ids: Vec<Uuid>,
    store: &Arc<ChatStore>,
    registry: &Arc<ConnectionRegistry>,
) {
    if message_ids.is_empty() {
        return;
    }

    let Some(counterpart_id) = resolve_counterpart(store, conversation_id, reader_id).await
    else {
        return;
    };

    if let Err(err) = store
        .mark_read(&message_ids, conversation_id, reader_id)
        .await
    {
        warn!(%conversation_id, error = %err, "failed to mark messages read");
        return;
    }

    if let Some(handle) = registry.lookup(counterpart_id).await {
        let _ = handle.tx.send(ServerFrame::Read {
            conversation_id,
            message_ids,
        });
    }
}

/// The other participant of `conversation_id`, or `None` when the
/// conversation is unknown or `user_id` is not in it.
async fn resolve_counterpart(
    store: &ChatStore,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Option<Uuid> {
    match store.conversation_by_id(conversation_id).await {
        Ok(Some(conversation)) => conversation.counterpart_of(user_id),
        Ok(None) => None,
        Err(err) => {
            warn!(%conversation_id, error = %err, "conversation lookup failed");
            None
        }
    }
}

/// Evolve the sender's memory of this conversation, off the hot path.
///
/// The spawned task owns copies of every identifier it needs, so it is
/// unaffected by the session or registry state changing after spawn.
pub(crate) fn spawn_memory_update(
    store: Arc<ChatStore>,
    conversation_id: Uuid,
    sender_id: Uuid,
    counterpart_id: Uuid,
    content: String,
) {
    tokio::spawn(async move {
        if let Err(err) = update_memory(&store, conversation_id, sender_id, &content).await {
            warn!(
                %conversation_id,
                %sender_id,
                %counterpart_id,
                error = %err,
                "memory update failed"
            );
        }
    });
}

/// Load-advance-save one (conversation, user) memory context.
async fn update_memory(
    store: &ChatStore,
    conversation_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> amora_core::Result<()> {
    let ctx = store.get_or_create_memory(conversation_id, user_id).await?;
    let updated = amora_memory::advance(&ctx, content);
    store.save_memory(&updated).await
}
