//! Relay wire protocol.
//!
//! Every frame on the socket is a `{type, data}` envelope, decoded up
//! front into a typed variant. A frame that fails to decode is dropped
//! without closing the connection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amora_core::types::{Message, MessageType};

/// Client → Server frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Probe after the handshake; the server re-sends its ack.
    Connect,
    /// Send a chat message into a conversation.
    Message {
        conversation_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },
    /// Typing indicator, forwarded to the counterpart only.
    Typing {
        conversation_id: Uuid,
        is_typing: bool,
    },
    /// Read receipt for a batch of received messages.
    Read {
        conversation_id: Uuid,
        message_ids: Vec<Uuid>,
    },
    /// End the session cleanly.
    Disconnect,
}

/// Server → Client frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Registration acknowledgment, echoing the caller's identity.
    Connect { user_id: Uuid },
    /// A persisted message, pushed to both participants.
    Message(Message),
    /// Counterpart's typing indicator.
    Typing {
        conversation_id: Uuid,
        is_typing: bool,
    },
    /// Counterpart read these messages.
    Read {
        conversation_id: Uuid,
        message_ids: Vec<Uuid>,
    },
}
