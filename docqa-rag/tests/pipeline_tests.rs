//! Query pipeline behavior against deterministic collaborator doubles.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use docqa_rag::{
    Answerer, Chunk, ContentStore, Embedder, Evaluator, QualityScores, QueryPipeline, RagError,
    ScoredChunk, TokenStream,
};
use docqa_rag::{CollectionInfo, StoredVector};

// ── Doubles ─────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, _text: &str) -> docqa_rag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Embedding {
                provider: "double".to_string(),
                message: "embedder down".to_string(),
            });
        }
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }
}

struct StaticStore {
    calls: AtomicUsize,
    results: Vec<ScoredChunk>,
    fail: bool,
}

impl StaticStore {
    fn with_results(results: Vec<ScoredChunk>) -> Self {
        Self { calls: AtomicUsize::new(0), results, fail: false }
    }

    fn failing() -> Self {
        Self { calls: AtomicUsize::new(0), results: Vec::new(), fail: true }
    }
}

#[async_trait]
impl ContentStore for StaticStore {
    async fn ensure_collection(&self, _dimensions: usize) -> docqa_rag::Result<()> {
        Ok(())
    }

    async fn upsert(&self, _vectors: &[StoredVector]) -> docqa_rag::Result<()> {
        Ok(())
    }

    async fn search(&self, _embedding: &[f32], top_k: usize) -> docqa_rag::Result<Vec<ScoredChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::Store {
                backend: "double".to_string(),
                message: "store down".to_string(),
            });
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn delete_all(&self) -> docqa_rag::Result<()> {
        Ok(())
    }

    async fn info(&self) -> docqa_rag::Result<CollectionInfo> {
        Ok(CollectionInfo {
            collection_name: "test".to_string(),
            total_documents: self.results.len() as u64,
            vectors_count: self.results.len() as u64,
            status: "green".to_string(),
        })
    }

    async fn document_sources(&self) -> docqa_rag::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn healthy(&self) -> bool {
        true
    }
}

struct ScriptedAnswerer {
    calls: AtomicUsize,
    fragments: Vec<&'static str>,
    fail_mid_stream: bool,
}

impl ScriptedAnswerer {
    fn new(fragments: Vec<&'static str>) -> Self {
        Self { calls: AtomicUsize::new(0), fragments, fail_mid_stream: false }
    }
}

#[async_trait]
impl Answerer for ScriptedAnswerer {
    async fn complete(&self, _question: &str, _context: &[Chunk]) -> docqa_rag::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fragments.concat())
    }

    async fn stream(&self, _question: &str, _context: &[Chunk]) -> docqa_rag::Result<TokenStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fragments = self.fragments.clone();
        let fail = self.fail_mid_stream;
        let stream = async_stream::try_stream! {
            for (i, fragment) in fragments.iter().enumerate() {
                if fail && i == fragments.len() / 2 {
                    Err(RagError::Generation {
                        provider: "double".to_string(),
                        message: "stream interrupted".to_string(),
                    })?;
                }
                yield fragment.to_string();
            }
        };
        Ok(Box::pin(stream))
    }
}

struct FixedEvaluator {
    scores: QualityScores,
}

#[async_trait]
impl Evaluator for FixedEvaluator {
    async fn evaluate(
        &self,
        _question: &str,
        _answer: &str,
        _context: &[Chunk],
    ) -> docqa_rag::Result<QualityScores> {
        Ok(self.scores)
    }
}

struct FailingEvaluator;

#[async_trait]
impl Evaluator for FailingEvaluator {
    async fn evaluate(
        &self,
        _question: &str,
        _answer: &str,
        _context: &[Chunk],
    ) -> docqa_rag::Result<QualityScores> {
        Err(RagError::Evaluation("judge unavailable".to_string()))
    }
}

struct SlowEvaluator;

#[async_trait]
impl Evaluator for SlowEvaluator {
    async fn evaluate(
        &self,
        _question: &str,
        _answer: &str,
        _context: &[Chunk],
    ) -> docqa_rag::Result<QualityScores> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(QualityScores { faithfulness: 1.0, answer_relevancy: 1.0 })
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn scored(text: &str, score: f32) -> ScoredChunk {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), "test.txt".to_string());
    ScoredChunk { chunk: Chunk { text: text.to_string(), metadata }, score }
}

struct Fixture {
    embedder: Arc<CountingEmbedder>,
    store: Arc<StaticStore>,
    answerer: Arc<ScriptedAnswerer>,
    pipeline: QueryPipeline,
}

fn fixture(evaluator: Option<Arc<dyn Evaluator>>) -> Fixture {
    fixture_with(
        Arc::new(CountingEmbedder::default()),
        Arc::new(StaticStore::with_results(vec![
            scored("chunk about rag", 0.95),
            scored("chunk about embeddings", 0.80),
        ])),
        Arc::new(ScriptedAnswerer::new(vec!["This is ", "a test ", "answer."])),
        evaluator,
        Duration::from_secs(30),
    )
}

fn fixture_with(
    embedder: Arc<CountingEmbedder>,
    store: Arc<StaticStore>,
    answerer: Arc<ScriptedAnswerer>,
    evaluator: Option<Arc<dyn Evaluator>>,
    timeout: Duration,
) -> Fixture {
    let mut builder = QueryPipeline::builder()
        .embedder(embedder.clone())
        .store(store.clone())
        .answerer(answerer.clone())
        .retrieval_k(4)
        .evaluation_timeout(timeout);
    if let Some(evaluator) = evaluator {
        builder = builder.evaluator(evaluator);
    }
    Fixture { embedder, store, answerer, pipeline: builder.build().unwrap() }
}

// ── Validation boundary ─────────────────────────────────────────────

#[tokio::test]
async fn empty_question_is_rejected_before_any_collaborator_call() {
    let f = fixture(None);

    let answer = f.pipeline.answer("", true, false).await;
    let search = f.pipeline.search("   ").await.map(drop);
    let stream = f.pipeline.answer_stream("").await.map(drop);

    assert!(matches!(answer, Err(RagError::Validation(_))));
    assert!(matches!(search, Err(RagError::Validation(_))));
    assert!(matches!(stream, Err(RagError::Validation(_))));
    assert_eq!(f.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.answerer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn over_long_question_is_rejected_before_any_collaborator_call() {
    let f = fixture(None);
    let question = "a".repeat(1001);

    let result = f.pipeline.answer(&question, false, false).await;

    assert!(matches!(result, Err(RagError::Validation(_))));
    assert_eq!(f.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn question_at_the_limit_is_accepted() {
    let f = fixture(None);
    let question = "a".repeat(1000);

    let envelope = f.pipeline.answer(&question, false, false).await.unwrap();
    assert_eq!(envelope.answer, "This is a test answer.");
}

// ── Envelope assembly ───────────────────────────────────────────────

#[tokio::test]
async fn sources_are_present_iff_requested() {
    let f = fixture(None);

    let with = f.pipeline.answer("What is RAG?", true, false).await.unwrap();
    let without = f.pipeline.answer("What is RAG?", false, false).await.unwrap();

    let sources = with.sources.expect("sources requested");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].content, "chunk about rag");
    assert!(without.sources.is_none());
}

#[tokio::test]
async fn envelope_echoes_question_and_records_timing() {
    let f = fixture(None);

    let envelope = f.pipeline.answer("What is RAG?", true, false).await.unwrap();

    assert_eq!(envelope.question, "What is RAG?");
    assert!(envelope.processing_time_ms >= 0.0);
    assert!(envelope.evaluation.is_none());
}

#[tokio::test]
async fn search_returns_results_without_generation() {
    let f = fixture(None);

    let results = f.pipeline.search("What is RAG?").await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.text, "chunk about rag");
    assert!(results[0].score > results[1].score);
    assert_eq!(f.answerer.calls.load(Ordering::SeqCst), 0);
}

// ── Evaluation policy ───────────────────────────────────────────────

#[tokio::test]
async fn evaluation_scores_are_propagated_exactly() {
    let evaluator =
        Arc::new(FixedEvaluator { scores: QualityScores { faithfulness: 0.9, answer_relevancy: 0.85 } });
    let f = fixture(Some(evaluator));

    let envelope = f.pipeline.answer("What is RAG?", true, true).await.unwrap();

    match envelope.evaluation.expect("evaluation requested") {
        docqa_rag::Evaluation::Scored { faithfulness, answer_relevancy, evaluation_time_ms } => {
            assert_eq!(faithfulness, 0.9);
            assert_eq!(answer_relevancy, 0.85);
            assert!(evaluation_time_ms >= 0.0);
        }
        other => panic!("expected scored evaluation, got {other:?}"),
    }
}

#[tokio::test]
async fn evaluation_failure_never_invalidates_the_answer() {
    let f = fixture(Some(Arc::new(FailingEvaluator)));

    let envelope = f.pipeline.answer("What is RAG?", true, true).await.unwrap();

    assert_eq!(envelope.answer, "This is a test answer.");
    let evaluation = envelope.evaluation.expect("evaluation requested");
    assert!(evaluation.error().unwrap().contains("judge unavailable"));
}

#[tokio::test]
async fn evaluation_timeout_is_embedded_not_fatal() {
    let f = fixture_with(
        Arc::new(CountingEmbedder::default()),
        Arc::new(StaticStore::with_results(vec![scored("chunk", 0.9)])),
        Arc::new(ScriptedAnswerer::new(vec!["answer"])),
        Some(Arc::new(SlowEvaluator)),
        Duration::from_millis(50),
    );

    let envelope = f.pipeline.answer("What is RAG?", false, true).await.unwrap();

    let evaluation = envelope.evaluation.expect("evaluation requested");
    assert!(evaluation.error().unwrap().contains("timed out"));
}

#[tokio::test]
async fn evaluation_not_requested_is_absent_even_with_evaluator() {
    let evaluator =
        Arc::new(FixedEvaluator { scores: QualityScores { faithfulness: 1.0, answer_relevancy: 1.0 } });
    let f = fixture(Some(evaluator));

    let envelope = f.pipeline.answer("What is RAG?", false, false).await.unwrap();
    assert!(envelope.evaluation.is_none());
}

// ── Streaming ───────────────────────────────────────────────────────

#[tokio::test]
async fn stream_concatenation_equals_complete_answer() {
    let f = fixture(None);

    let complete = f.pipeline.answer("What is RAG?", false, false).await.unwrap().answer;

    let mut stream = f.pipeline.answer_stream("What is RAG?").await.unwrap();
    let mut streamed = String::new();
    while let Some(fragment) = stream.next().await {
        streamed.push_str(&fragment.unwrap());
    }

    assert_eq!(streamed, complete);
}

#[tokio::test]
async fn stream_preserves_fragment_order() {
    let f = fixture(None);

    let mut stream = f.pipeline.answer_stream("What is RAG?").await.unwrap();
    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        fragments.push(fragment.unwrap());
    }

    assert_eq!(fragments, vec!["This is ", "a test ", "answer."]);
}

#[tokio::test]
async fn mid_stream_failure_surfaces_as_an_error_item() {
    let answerer = Arc::new(ScriptedAnswerer {
        calls: AtomicUsize::new(0),
        fragments: vec!["one ", "two ", "three ", "four"],
        fail_mid_stream: true,
    });
    let f = fixture_with(
        Arc::new(CountingEmbedder::default()),
        Arc::new(StaticStore::with_results(vec![scored("chunk", 0.9)])),
        answerer,
        None,
        Duration::from_secs(30),
    );

    let mut stream = f.pipeline.answer_stream("What is RAG?").await.unwrap();
    let mut delivered = String::new();
    let mut failure = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => delivered.push_str(&fragment),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    assert_eq!(delivered, "one two ");
    assert!(matches!(failure, Some(RagError::Generation { .. })));
}

// ── Hard failures ───────────────────────────────────────────────────

#[tokio::test]
async fn embedding_failure_fails_the_whole_request() {
    let f = fixture_with(
        Arc::new(CountingEmbedder { calls: AtomicUsize::new(0), fail: true }),
        Arc::new(StaticStore::with_results(vec![])),
        Arc::new(ScriptedAnswerer::new(vec!["answer"])),
        None,
        Duration::from_secs(30),
    );

    let result = f.pipeline.answer("What is RAG?", true, false).await;

    assert!(matches!(result, Err(RagError::Embedding { .. })));
    assert_eq!(f.store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.answerer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_failure_fails_the_whole_request() {
    let f = fixture_with(
        Arc::new(CountingEmbedder::default()),
        Arc::new(StaticStore::failing()),
        Arc::new(ScriptedAnswerer::new(vec!["answer"])),
        None,
        Duration::from_secs(30),
    );

    let result = f.pipeline.answer("What is RAG?", true, false).await;

    assert!(matches!(result, Err(RagError::Store { .. })));
    assert_eq!(f.answerer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_collection_still_produces_an_answer() {
    let f = fixture_with(
        Arc::new(CountingEmbedder::default()),
        Arc::new(StaticStore::with_results(vec![])),
        Arc::new(ScriptedAnswerer::new(vec!["I cannot find relevant information."])),
        None,
        Duration::from_secs(30),
    );

    let envelope = f.pipeline.answer("What is RAG?", true, false).await.unwrap();

    assert_eq!(envelope.answer, "I cannot find relevant information.");
    assert_eq!(envelope.sources.unwrap().len(), 0);
}
