//! Retrieval-augmented conversational agent.
//!
//! Two-state loop per turn: ask the model (with the retrieval tool bound),
//! and when the reply carries tool-call requests, execute each one, append
//! the results as tool messages, and hand control back to the model.

use std::sync::Arc;

use crate::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::tools::{execute_tool, Retriever};

const DEFAULT_MAX_STEPS: usize = 10;

pub const RAG_SYSTEM_PROMPT: &str = "\
You are a Retrieval-Augmented Generation (RAG) assistant.
Always query the vector database first before generating a response.
Follow these rules:

1. Retrieve the most relevant context chunks from the database (top-k search).
2. If relevant content is found, use it as the primary source. Do not fabricate details.
3. If multiple documents are retrieved, compare and summarize them clearly.
4. If no relevant information is found:
   - For knowledge-based questions, respond exactly with:
     \"I could not find relevant information in the knowledge base.\"
   - For casual conversation (greetings, chit-chat, generic questions), reply naturally using your internal knowledge.
5. Always be clear, concise, and directly address the user query.

Your role: act as a knowledge-grounded assistant while remaining conversational when appropriate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RagTurnState {
    AskModel,
    RunTool,
    Done,
}

pub struct RagAgent {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    max_steps: usize,
}

impl RagAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Retriever) -> Self {
        Self {
            provider,
            retriever,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Run one user turn to completion, appending every produced message to
    /// `history`. The model sees the system instruction plus the entire
    /// persisted history on each step; no truncation is performed.
    pub async fn run_turn(&self, history: &mut Vec<ChatMessage>) -> Result<(), ApiError> {
        let mut state = RagTurnState::AskModel;
        let mut step = 0usize;

        loop {
            if step >= self.max_steps {
                return Err(ApiError::Internal(format!(
                    "RAG agent exceeded maximum steps ({})",
                    self.max_steps
                )));
            }
            step += 1;

            match state {
                RagTurnState::AskModel => {
                    let mut messages = vec![ChatMessage::system(RAG_SYSTEM_PROMPT)];
                    messages.extend(history.iter().cloned());

                    let reply = self
                        .provider
                        .complete(ChatRequest::new(messages).with_tools(vec![Retriever::spec()]))
                        .await?;

                    let wants_tools = reply.has_tool_calls();
                    history.push(reply);
                    state = if wants_tools {
                        RagTurnState::RunTool
                    } else {
                        RagTurnState::Done
                    };
                }
                RagTurnState::RunTool => {
                    let calls = history
                        .last()
                        .filter(|msg| msg.is_assistant())
                        .map(|msg| msg.tool_calls.clone())
                        .unwrap_or_default();

                    for call in &calls {
                        tracing::debug!("Executing tool call '{}' ({})", call.name, call.id);
                        let observation = execute_tool(&self.retriever, call).await?;
                        history.push(ChatMessage::tool(observation, call.id.clone()));
                    }
                    state = RagTurnState::AskModel;
                }
                RagTurnState::Done => return Ok(()),
            }
        }
    }
}
