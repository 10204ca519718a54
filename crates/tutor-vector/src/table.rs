//! Collection housekeeping and point upsert.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use tutor_core::types::RetrievalRecord;
use tutor_core::{Error, Result};

use crate::QdrantStore;

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [RetrievalRecord],
}

pub async fn list_collections(store: &QdrantStore) -> Result<Vec<String>> {
    let response = store
        .client
        .get(store.url("/collections"))
        .send()
        .await
        .map_err(|e| Error::upstream("vector store", e))?;
    let response = error_for_status(response).await?;
    let body: CollectionsResponse = response.json().await.map_err(|e| Error::unexpected("collections response", e))?;
    Ok(body.result.collections.into_iter().map(|c| c.name).collect())
}

pub async fn ensure_collection(store: &QdrantStore) -> Result<()> {
    let names = list_collections(store).await?;
    if names.iter().any(|n| n == store.collection()) {
        debug!(collection = store.collection(), "collection already exists");
        return Ok(());
    }
    let body = json!({ "vectors": { "size": store.dimension, "distance": "Cosine" } });
    let response = store
        .client
        .put(store.url(&format!("/collections/{}", store.collection())))
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::upstream("vector store", e))?;
    error_for_status(response).await?;
    info!(collection = store.collection(), size = store.dimension, "created collection");
    Ok(())
}

pub async fn upsert_points(store: &QdrantStore, records: &[RetrievalRecord]) -> Result<()> {
    if records.is_empty() { return Ok(()); }
    for record in records { store.check_dimension(&record.vector)?; }
    let response = store
        .client
        .put(store.url(&format!("/collections/{}/points?wait=true", store.collection())))
        .json(&UpsertBody { points: records })
        .send()
        .await
        .map_err(|e| Error::upstream("vector store", e))?;
    error_for_status(response).await?;
    debug!(collection = store.collection(), points = records.len(), "upserted points");
    Ok(())
}

pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() { return Ok(response); }
    let text = response.text().await.unwrap_or_default();
    if let Some((expected, actual)) = parse_dimension_error(&text) {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    Err(Error::UpstreamUnavailable(format!("vector store returned {status}: {text}")))
}

/// Pulls `(expected, got)` out of messages such as
/// `Wrong input: Vector dimension error: expected dim: 384, got 3`.
pub(crate) fn parse_dimension_error(body: &str) -> Option<(usize, usize)> {
    let lower = body.to_lowercase();
    if !lower.contains("dimension") { return None; }
    let number_after = |marker: &str| -> Option<usize> {
        let start = lower.find(marker)? + marker.len();
        let digits: String = lower[start..].trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    };
    Some((number_after("expected dim:")?, number_after("got")?))
}
