//! Amora Core - Chat Engine
//!
//! This crate provides the server-side core for the Amora dating chat
//! backend, including:
//! - Types: users, conversations, messages, and suggestion records
//! - Store: SQLite persistence for every entity plus memory contexts
//! - Auth: opaque bearer tokens, hashed at rest
//! - Sms: phone verification codes with a short TTL
//! - Suggest: the reply suggestion assembler over any [`ChatProvider`]
//!
//! [`ChatProvider`]: amora_llm::ChatProvider

#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod sms;
pub mod store;
pub mod suggest;
pub mod types;

pub use auth::{AuthError, AuthStore};
pub use error::{advisory, Error, Result};
pub use sms::{is_valid_phone, CodeError, CodeStore};
pub use store::ChatStore;
pub use suggest::{HistoryTurn, SuggestionAssembler, SuggestionContext};
pub use types::{
    Conversation, ConversationSummary, FlirtStyle, Gender, Message, MessageStatus, MessageType,
    PeerProfile, ProfileUpdate, Suggestion, SuggestionRecord, User,
};
