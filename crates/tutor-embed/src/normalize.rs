//! Response-shape normalization for embedding backends.
//!
//! Recognized shapes are a flat vector (`[f32]`), a batch (`[[f32]]`) and an
//! OpenAI-style envelope (`{"data": [{"embedding": [f32], "index": n}]}`).
//! An object carrying an `error` string, or an `error.message` string, is the
//! backend reporting a failure. Anything else is `UnexpectedFormat`.

use serde::Deserialize;
use serde_json::Value;
use tutor_core::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireShape {
    Batch(Vec<Vec<f32>>),
    Flat(Vec<f32>),
    Envelope(Envelope),
}

enum Shape {
    Batch(Vec<Vec<f32>>),
    Flat(Vec<f32>),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<EnvelopeItem>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

fn parse_shape(value: Value) -> Result<Shape> {
    let error = value.get("error");
    if let Some(message) = error.and_then(Value::as_str).or_else(|| error?.get("message")?.as_str()) {
        return Err(Error::UpstreamUnavailable(format!("embedding backend: {message}")));
    }
    let preview = preview(&value);
    let shape: WireShape = serde_json::from_value(value)
        .map_err(|_| Error::UnexpectedFormat(format!("embedding response is not a recognized shape: {preview}")))?;
    Ok(match shape {
        WireShape::Batch(batch) => Shape::Batch(batch),
        WireShape::Flat(vector) => Shape::Flat(vector),
        WireShape::Envelope(mut envelope) => {
            if envelope.data.iter().all(|item| item.index.is_some()) {
                envelope.data.sort_by_key(|item| item.index);
            }
            Shape::Batch(envelope.data.into_iter().map(|item| item.embedding).collect())
        }
    })
}

/// Vector for a single input. A batch-shaped answer yields its first element.
pub fn normalize_single(value: Value) -> Result<Vec<f32>> {
    let vector = match parse_shape(value)? {
        Shape::Flat(v) => v,
        Shape::Batch(batch) => batch
            .into_iter()
            .next()
            .ok_or_else(|| Error::UnexpectedFormat("embedding response is an empty batch".into()))?,
    };
    non_empty(vector)
}

/// Exactly `expected` vectors in response order. A flat vector is accepted
/// only when one input was sent.
pub fn normalize_batch(value: Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let vectors = match parse_shape(value)? {
        Shape::Batch(batch) => batch,
        Shape::Flat(v) if expected == 1 => vec![v],
        Shape::Flat(_) => {
            return Err(Error::UnexpectedFormat(format!("got a single vector for {expected} inputs")))
        }
    };
    if vectors.len() != expected {
        return Err(Error::UnexpectedFormat(format!(
            "embedding backend returned {} vectors for {} inputs",
            vectors.len(),
            expected
        )));
    }
    vectors.into_iter().map(non_empty).collect()
}

fn non_empty(vector: Vec<f32>) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(Error::UnexpectedFormat("embedding vector is empty".into()));
    }
    Ok(vector)
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(120) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
