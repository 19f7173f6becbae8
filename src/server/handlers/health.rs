use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::embedding::Embedder;
use crate::llm::LlmProvider;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let provider_healthy = state.provider.health_check().await.unwrap_or(false);

    Json(json!({
        "provider": state.provider.name(),
        "provider_healthy": provider_healthy,
        "embedder": state.embedder.id(),
        "indexed_chunks": state.index.len(),
        "chat_threads": state.chat_conversations.thread_count(),
        "flow_threads": state.flow_conversations.thread_count(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
