//! Amora LLM - Chat Provider Abstraction
//!
//! This crate provides the LLM integration for Amora:
//! - Provider: the [`ChatProvider`] trait the suggestion assembler works
//!   against
//! - Qwen: Alibaba Qwen provider via the DashScope OpenAI-compatible
//!   endpoint (the production backend)
//!
//! Requests and responses are plain chat completions; prompt construction
//! and response parsing live with the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod provider;
pub mod qwen;

pub use completion::{ChatRequest, ChatResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use provider::ChatProvider;
pub use qwen::{QwenConfig, QwenProvider};
