use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{AppConfig, EmbeddingProviderKind};
use crate::embedding::{Embedder, HashedNgramEmbedder, HttpEmbedder};
use crate::graph::flow::FlowAgent;
use crate::graph::rag::RagAgent;
use crate::history::{ConversationStore, SessionRegistry};
use crate::index::VectorIndex;
use crate::ingest::{IngestPipeline, PdfTextExtractor, RecursiveSplitter};
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::tools::Retriever;

pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<VectorIndex>,
    pub pipeline: IngestPipeline,
    pub rag_agent: RagAgent,
    pub flow_agent: FlowAgent,
    pub chat_sessions: SessionRegistry,
    pub flow_sessions: SessionRegistry,
    pub chat_conversations: ConversationStore,
    pub flow_conversations: ConversationStore,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let embedder: Arc<dyn Embedder> = match config.embedding.provider {
            EmbeddingProviderKind::Local => {
                Arc::new(HashedNgramEmbedder::new(config.embedding.dimensions))
            }
            EmbeddingProviderKind::Http => Arc::new(HttpEmbedder::new(
                config.embedding.base_url.clone(),
                config.embedding.model.clone(),
                config.embedding_api_key(),
            )),
        };

        // The index dimension is fixed at startup from a sample call.
        let dimension = embedder
            .embed("sample text")
            .await
            .map_err(|err| anyhow::anyhow!("Embedding probe failed: {}", err))?
            .len();
        tracing::info!(
            "Embedder '{}' ready, dimension {}",
            embedder.id(),
            dimension
        );
        let index = Arc::new(VectorIndex::new(dimension));

        let pipeline = IngestPipeline::new(
            Arc::new(PdfTextExtractor::new(config.ingest.extraction_timeout_secs)),
            embedder.clone(),
            index.clone(),
            RecursiveSplitter::new(config.ingest.chunk_size, config.ingest.chunk_overlap),
        );

        let provider: Arc<dyn LlmProvider> =
            Arc::new(OpenAiCompatProvider::new(&config.llm, config.llm_api_key()));

        let retriever = Retriever::new(embedder.clone(), index.clone(), config.retrieval.top_k);
        let rag_agent = RagAgent::new(provider.clone(), retriever);
        let flow_agent = FlowAgent::new(provider.clone());

        tokio::fs::create_dir_all(&config.ingest.upload_dir).await?;

        Ok(Arc::new(AppState {
            config,
            provider,
            embedder,
            index,
            pipeline,
            rag_agent,
            flow_agent,
            chat_sessions: SessionRegistry::new(),
            flow_sessions: SessionRegistry::new(),
            chat_conversations: ConversationStore::new(),
            flow_conversations: ConversationStore::new(),
            started_at: Utc::now(),
        }))
    }
}
