use async_trait::async_trait;

use super::types::{ChatMessage, ChatRequest};
use crate::errors::ApiError;

/// Chat-completion backend. Stateless per call: all context travels in the
/// request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai_compat", "scripted")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion; the returned assistant message may carry zero or
    /// more tool-call requests
    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage, ApiError>;
}
