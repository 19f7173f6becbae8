//! Conversational agents as explicit finite-state machines.
//!
//! Each agent runs one turn to completion over a mutable message history:
//! the caller appends the new user message, invokes the agent, then reads
//! the last assistant message as the reply.

pub mod flow;
pub mod rag;

use crate::llm::ChatMessage;

pub const NO_RESPONSE_FALLBACK: &str = "No response.";

/// Text of the last assistant message, if any.
pub fn last_assistant_text(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|msg| msg.is_assistant() && !msg.content.is_empty())
        .map(|msg| msg.content.clone())
}

/// User-visible reply for a finished turn. Substitutes a fallback string
/// when no assistant message exists rather than failing the request.
pub fn final_reply(messages: &[ChatMessage]) -> String {
    last_assistant_text(messages).unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string())
}
