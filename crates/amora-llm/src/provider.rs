//! Chat provider trait
//!
//! The suggestion assembler talks to any backing model through this trait,
//! so the HTTP transport stays swappable and tests can stub it out.

use crate::completion::{ChatRequest, ChatResponse};
use crate::error::Result;

/// A chat completion backend
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}
