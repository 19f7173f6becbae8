use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::graph::final_reply;
use crate::llm::ChatMessage;
use crate::state::AppState;

fn default_user() -> String {
    "default_user".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub query: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FlowRequestBody {
    #[serde(default = "default_user")]
    pub user_id: String,
    pub user_message: String,
}

/// `POST /chat` — retrieval-augmented chat over the uploaded documents.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let thread_id = state.chat_sessions.resolve(&payload.user_id);
    let conversation = state.chat_conversations.conversation(&thread_id);

    // Per-thread lock: concurrent requests for the same thread run one at a
    // time and never interleave history appends.
    let mut history = conversation.lock().await;
    history.push(ChatMessage::user(payload.query));
    state.rag_agent.run_turn(&mut history).await?;

    let reply = final_reply(&history);
    tracing::debug!("Chat turn complete for thread {}", thread_id);

    Ok(Json(json!({
        "response": reply,
        "thread_id": thread_id,
    })))
}

/// `POST /chat/flow` — guided-collection chatbot.
pub async fn chat_flow(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FlowRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.user_message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Message must not be empty".to_string(),
        ));
    }

    let thread_id = state.flow_sessions.resolve(&payload.user_id);
    let conversation = state.flow_conversations.conversation(&thread_id);

    let mut history = conversation.lock().await;
    history.push(ChatMessage::user(payload.user_message));
    state.flow_agent.run_turn(&mut history).await?;

    let reply = final_reply(&history);
    tracing::debug!("Flow turn complete for thread {}", thread_id);

    Ok(Json(json!({
        "bot_messages": reply,
        "thread_id": thread_id,
    })))
}
