use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use tutor_core::types::{Payload, RetrievalHit};
use tutor_core::{Error, Result};

use crate::table::error_for_status;
use crate::QdrantStore;

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl From<ScoredPoint> for RetrievalHit {
    fn from(p: ScoredPoint) -> Self {
        let id = match p.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let payload = p.payload.as_ref().map(Payload::from_json).unwrap_or_default();
        RetrievalHit { id, score: p.score, payload }
    }
}

pub async fn search_points(store: &QdrantStore, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> {
    store.check_dimension(vector)?;
    if limit == 0 { return Ok(vec![]); }
    let response = store
        .client
        .post(store.url(&format!("/collections/{}/points/search", store.collection())))
        .json(&SearchBody { vector, limit, with_payload: true })
        .send()
        .await
        .map_err(|e| Error::upstream("vector store", e))?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        warn!(collection = store.collection(), "collection not found; returning no hits");
        return Ok(vec![]);
    }
    let response = error_for_status(response).await?;
    let body: SearchResponse = response.json().await.map_err(|e| Error::unexpected("search response", e))?;
    let mut hits: Vec<RetrievalHit> = body.result.into_iter().map(RetrievalHit::from).collect();
    hits.truncate(limit);
    debug!(collection = store.collection(), hits = hits.len(), "vector search");
    Ok(hits)
}
