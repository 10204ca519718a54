use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use tutor_core::config::VectorSettings;
use tutor_core::data_processor::DocumentChunk;
use tutor_core::traits::VectorStore;
use tutor_core::types::{RetrievalHit, RetrievalRecord};
use tutor_core::Error;
use tutor_embed::FakeEmbedder;
use tutor_rag::ContextBlock;
use tutor_vector::{QdrantStore, VectorIndexer};

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn store(url: String, dimension: usize) -> QdrantStore {
    let settings = VectorSettings { url, collection: "training_chunks".into(), top_k: 5, timeout_secs: 5 };
    QdrantStore::new(settings, dimension).unwrap()
}

#[tokio::test]
async fn search_returns_hits_in_backend_order_with_payloads() {
    let router = Router::new().route(
        "/collections/training_chunks/points/search",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["limit"], 2);
            assert_eq!(body["with_payload"], true);
            Json(json!({
                "status": "ok",
                "result": [
                    { "id": "a1", "score": 0.91, "payload": { "doc_id": "escalation", "content": "Call the supervisor." } },
                    { "id": 42, "score": 0.55 }
                ]
            }))
        }),
    );
    let store = store(spawn_backend(router).await, 3);
    let hits = store.search(&[0.1, 0.2, 0.3], 2).await.unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "a1");
    assert_eq!(hits[0].payload.doc_id.as_deref(), Some("escalation"));
    assert_eq!(hits[1].id, "42");
    assert_eq!(hits[1].payload.content, None);
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn odd_payloads_degrade_instead_of_failing_the_search() {
    let router = Router::new().route(
        "/collections/training_chunks/points/search",
        post(|| async {
            Json(json!({
                "status": "ok",
                "result": [
                    { "id": "dup", "score": 0.9, "payload": { "doc_id": "a", "page": 3, "page_number": 3, "content": "x" } },
                    { "id": "num", "score": 0.8, "payload": { "doc_id": 42, "content": "y" } },
                    { "id": "bad", "score": 0.7, "payload": { "doc_id": { "v": 1 }, "source_path": false, "content": "z" } },
                    { "id": "null", "score": 0.6, "payload": null }
                ]
            }))
        }),
    );
    let store = store(spawn_backend(router).await, 2);
    let hits = store.search(&[0.0, 1.0], 5).await.unwrap();

    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].payload.page_number, Some(3));
    assert_eq!(hits[1].payload.doc_id.as_deref(), Some("42"));
    assert_eq!(hits[2].payload.content.as_deref(), Some("z"));

    let labels: Vec<String> = ContextBlock::assemble(&hits, 100).entries.into_iter().map(|e| e.label).collect();
    assert_eq!(labels, vec!["a, page 3", "42", "unknown", "unknown"]);
}

#[tokio::test]
async fn empty_collection_yields_no_hits() {
    let router = Router::new().route(
        "/collections/training_chunks/points/search",
        post(|| async { Json(json!({ "status": "ok", "result": [] })) }),
    );
    let store = store(spawn_backend(router).await, 2);
    assert!(store.search(&[0.0, 1.0], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_collection_yields_no_hits() {
    let store = store(spawn_backend(Router::new()).await, 2);
    assert!(store.search(&[0.0, 1.0], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_sized_query_is_rejected_before_sending() {
    let store = store("http://127.0.0.1:9".into(), 384);
    let err = store.search(&[0.1, 0.2], 5).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 384, actual: 2 }));
}

#[tokio::test]
async fn backend_dimension_error_is_surfaced() {
    let router = Router::new().route(
        "/collections/training_chunks/points/search",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": { "error": "Wrong input: Vector dimension error: expected dim: 384, got 2" } })),
            )
        }),
    );
    let store = store(spawn_backend(router).await, 2);
    let err = store.search(&[0.1, 0.2], 5).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 384, actual: 2 }), "{err}");
}

#[tokio::test]
async fn ensure_collection_creates_only_when_missing() {
    let created = Arc::new(AtomicBool::new(false));
    let flag = created.clone();
    let router = Router::new()
        .route("/collections", get(|| async { Json(json!({ "result": { "collections": [ { "name": "other" } ] } })) }))
        .route(
            "/collections/{name}",
            put(move |Path(name): Path<String>, Json(body): Json<Value>| {
                let flag = flag.clone();
                async move {
                    assert_eq!(name, "training_chunks");
                    assert_eq!(body["vectors"]["size"], 4);
                    assert_eq!(body["vectors"]["distance"], "Cosine");
                    flag.store(true, Ordering::SeqCst);
                    Json(json!({ "result": true }))
                }
            }),
        );
    let store = store(spawn_backend(router).await, 4);
    store.ensure_collection().await.unwrap();
    assert!(created.load(Ordering::SeqCst));
}

#[derive(Default)]
struct RecordingStore {
    ensured: AtomicBool,
    records: Mutex<Vec<RetrievalRecord>>,
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn ensure_collection(&self) -> tutor_core::Result<()> {
        self.ensured.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, records: &[RetrievalRecord]) -> tutor_core::Result<()> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn search(&self, _vector: &[f32], _limit: usize) -> tutor_core::Result<Vec<RetrievalHit>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn indexer_writes_one_point_per_chunk_with_payload() {
    let chunks: Vec<DocumentChunk> = (0..5)
        .map(|i| DocumentChunk {
            doc_id: "handbook".into(),
            course_id: "general".into(),
            module_id: "intro".into(),
            source_path: "data/handbook.txt".into(),
            content: format!("chunk number {i}"),
            chunk_index: i,
            total_chunks: 5,
        })
        .collect();
    let recording = Arc::new(RecordingStore::default());
    let indexer = VectorIndexer::new(recording.clone(), Arc::new(FakeEmbedder::new(8)), 2).quiet();

    let written = indexer.index_chunks(&chunks).await.unwrap();

    assert_eq!(written, 5);
    assert!(recording.ensured.load(Ordering::SeqCst));
    let records = recording.records.lock().unwrap();
    assert_eq!(records.len(), 5);
    for (record, chunk) in records.iter().zip(&chunks) {
        assert_eq!(record.vector.len(), 8);
        assert_eq!(record.payload.content.as_deref(), Some(chunk.content.as_str()));
        assert_eq!(record.payload.doc_id.as_deref(), Some("handbook"));
    }
    let ids: std::collections::HashSet<_> = records.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), 5, "point ids are unique");
}
