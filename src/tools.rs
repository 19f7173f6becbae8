//! Retrieval tool exposed to the RAG agent.
//!
//! The tool contract is textual in both directions: a failed search is
//! converted into a readable error string returned as the tool result, so a
//! tool fault never aborts the conversation turn.

use std::sync::Arc;

use serde_json::json;

use crate::embedding::Embedder;
use crate::errors::ApiError;
use crate::index::VectorIndex;
use crate::llm::{ToolCallRequest, ToolSpec};

pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found.";

/// The closed set of tools the system can execute. Only retrieval exists;
/// resolving an unknown name is a configuration defect, not a runtime
/// condition to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    RetrieveContext,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::RetrieveContext => "retrieve_context",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "retrieve_context" => Some(ToolKind::RetrieveContext),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k: top_k.max(1),
        }
    }

    pub fn spec() -> ToolSpec {
        ToolSpec {
            name: ToolKind::RetrieveContext.name().to_string(),
            description: "Retrieve the most relevant context chunks from the document index \
                          for answering the user's query."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Top-k retrieval as a plain string. Never fails from the caller's
    /// perspective: an empty index yields the sentinel, an underlying fault
    /// yields a readable error string.
    pub async fn retrieve(&self, query: &str) -> String {
        if self.index.is_empty() {
            return NO_CONTEXT_SENTINEL.to_string();
        }

        match self.try_retrieve(query).await {
            Ok(Some(context)) => context,
            Ok(None) => NO_CONTEXT_SENTINEL.to_string(),
            Err(err) => {
                tracing::warn!("Retrieval failed for query '{}': {}", query, err);
                format!("Error while retrieving context: {}", err)
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<Option<String>, ApiError> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|err| ApiError::ToolExecution(err.to_string()))?;
        let matches = self
            .index
            .search(&vector, self.top_k)
            .map_err(|err| ApiError::ToolExecution(err.to_string()))?;
        if matches.is_empty() {
            return Ok(None);
        }

        let context = matches
            .iter()
            .map(|m| m.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(context))
    }
}

/// Dispatch a model-issued tool call. The textual result is appended to the
/// conversation as a tool message by the caller.
pub async fn execute_tool(retriever: &Retriever, call: &ToolCallRequest) -> Result<String, ApiError> {
    match ToolKind::from_name(&call.name) {
        Some(ToolKind::RetrieveContext) => {
            let query = call
                .arguments
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(retriever.retrieve(query).await)
        }
        None => Err(ApiError::InternalConsistency(format!(
            "Model requested unknown tool '{}'",
            call.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedNgramEmbedder;
    use crate::index::StoredChunk;

    async fn seeded_retriever(texts: &[&str]) -> (Retriever, Arc<VectorIndex>) {
        let embedder = Arc::new(HashedNgramEmbedder::new(64));
        let index = Arc::new(VectorIndex::new(64));
        for (i, text) in texts.iter().enumerate() {
            let vector = embedder.embed(text).await.unwrap();
            index
                .add(
                    vector,
                    StoredChunk {
                        text: text.to_string(),
                        source: "seed.pdf#page=1".to_string(),
                        chunk_index: i,
                    },
                )
                .unwrap();
        }
        (Retriever::new(embedder, index.clone(), 2), index)
    }

    #[tokio::test]
    async fn empty_index_returns_sentinel() {
        let (retriever, _index) = seeded_retriever(&[]).await;
        let result = retriever.retrieve("anything at all").await;
        assert_eq!(result, NO_CONTEXT_SENTINEL);
    }

    #[tokio::test]
    async fn non_empty_index_returns_nearest_chunk_even_for_unrelated_query() {
        let (retriever, _index) = seeded_retriever(&["Hello world"]).await;
        let result = retriever.retrieve("unrelated topic").await;
        // The single stored chunk is the nearest neighbor no matter the
        // distance; the sentinel only applies to an empty index.
        assert_eq!(result, "Hello world");
    }

    #[tokio::test]
    async fn query_matches_most_similar_chunk_first() {
        let (retriever, _index) = seeded_retriever(&[
            "Rust is a systems programming language",
            "The weather in Lisbon is sunny today",
        ])
        .await;
        let result = retriever.retrieve("systems programming in Rust").await;
        let first = result.split("\n\n").next().unwrap();
        assert_eq!(first, "Rust is a systems programming language");
    }

    #[tokio::test]
    async fn unknown_tool_name_is_a_consistency_error() {
        let (retriever, _index) = seeded_retriever(&[]).await;
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: "delete_everything".to_string(),
            arguments: json!({}),
        };
        let err = execute_tool(&retriever, &call).await.unwrap_err();
        assert!(matches!(err, ApiError::InternalConsistency(_)));
    }

    #[tokio::test]
    async fn retrieval_tool_executes_by_name() {
        let (retriever, _index) = seeded_retriever(&["Hello world"]).await;
        let call = ToolCallRequest {
            id: "call_1".to_string(),
            name: "retrieve_context".to_string(),
            arguments: json!({"query": "hello"}),
        };
        let result = execute_tool(&retriever, &call).await.unwrap();
        assert_eq!(result, "Hello world");
    }
}
