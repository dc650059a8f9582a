use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use docqa_rag::{
    ContentStore, Embedder, Evaluator, IngestionPipeline, OpenAiAnswerer, OpenAiEmbedder,
    OpenAiJudge, QdrantContentStore, QueryPipeline, RecursiveChunker, Settings,
};
use docqa_server::{AppState, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
        &settings.openai_api_key,
        &settings.embedding_model,
        settings.embedding_dimensions,
    )?);
    let answerer = Arc::new(OpenAiAnswerer::new(
        &settings.openai_api_key,
        &settings.llm_model,
        settings.llm_temperature,
    )?);
    let store = Arc::new(QdrantContentStore::connect(
        &settings.qdrant_url,
        settings.qdrant_api_key.clone(),
        &settings.collection_name,
    )?);

    store
        .ensure_collection(settings.embedding_dimensions)
        .await
        .context("could not prepare qdrant collection")?;

    let mut query_builder = QueryPipeline::builder()
        .embedder(embedder.clone())
        .store(store.clone())
        .answerer(answerer)
        .retrieval_k(settings.retrieval_k)
        .evaluation_timeout(Duration::from_secs_f64(settings.evaluation_timeout_seconds));
    if settings.enable_evaluation {
        let judge: Arc<dyn Evaluator> =
            Arc::new(OpenAiJudge::new(&settings.openai_api_key, &settings.llm_model)?);
        query_builder = query_builder.evaluator(judge);
    }
    let query = Arc::new(query_builder.build()?);

    let ingestion = Arc::new(IngestionPipeline::new(
        Arc::new(RecursiveChunker::new(settings.chunk_size, settings.chunk_overlap)),
        embedder,
        store.clone(),
    ));

    let router = app(AppState::new(query, ingestion, store));

    let addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener =
        tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("bind {addr}"))?;
    info!(%addr, collection = %settings.collection_name, "serving");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
