//! Collaborator traits for the chat model and the fact service.
//!
//! The assistant core consumes exactly two external capabilities: chat
//! completion and short-answer fact lookup. Both are object-safe async
//! traits behind `Arc<dyn …>`, so tests inject fakes and embedding
//! applications swap backends without touching the core.
//!
//! # Decline semantics
//!
//! A fact service that understands the protocol but cannot answer a query
//! returns [`FactDeclined`](crate::MuninnError::FactDeclined). Declines are
//! permanent (never retried), cached in their own namespace, and treated by
//! the orchestrator as "ask the model instead" rather than as failures.

use async_trait::async_trait;

use crate::Result;
use crate::types::Message;

/// A conversational language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Stable identifier mixed into cache keys so responses from different
    /// backends or models never collide.
    fn endpoint_tag(&self) -> &str;

    /// Complete a conversation, returning the assistant's reply text.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// A short-answer factual lookup service.
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Stable identifier mixed into cache keys.
    fn endpoint_tag(&self) -> &str;

    /// Answer a single self-contained factual question.
    ///
    /// Returns [`FactDeclined`](crate::MuninnError::FactDeclined) when the
    /// service reports it cannot interpret or answer the question.
    async fn lookup(&self, query: &str) -> Result<String>;
}
