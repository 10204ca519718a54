//! Domain types shared by the adapters, the pipeline and the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a conversation turn. Closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Upper-case tag used when serializing history into prompts.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Payload stored next to each vector.
///
/// - `doc_id`: stable document identity (file stem)
/// - `source_path`: original path of the ingested file
/// - `page_number`: page of the source, when the document is paged
/// - `course_id`/`module_id`: folder-derived grouping written by ingestion
/// - `content`: the chunk text
///
/// Every field is optional so that records written by other tools still load;
/// missing labels degrade at context assembly time. Points read back from the
/// store go through `Payload::from_json`, which tolerates foreign key names
/// and mistyped values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Payload {
    /// Reads an arbitrary stored mapping field by field. For each field the
    /// first listed key holding a usable value wins; ids accept strings or
    /// numbers, pages accept integers or numeric strings. Anything else is
    /// treated as absent, never as an error.
    pub fn from_json(value: &Value) -> Self {
        let text = |keys: &[&str]| keys.iter().find_map(|k| value.get(*k).and_then(scalar_text));
        Payload {
            doc_id: text(&["doc_id", "documentId", "document_id"]),
            source_path: text(&["source_path", "sourcePath", "source"]),
            page_number: ["page_number", "pageNumber", "page"].iter().find_map(|k| value.get(*k).and_then(page_value)),
            course_id: text(&["course_id", "courseId"]),
            module_id: text(&["module_id", "moduleId"]),
            content: value.get("content").and_then(Value::as_str).map(str::to_string),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn page_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A point written to the vector store. `vector.len()` must equal the
/// collection's configured dimensionality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A stored record ranked by similarity. Higher `score` is better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Incremental output of one streamed answer.
///
/// Zero or more `Token`s followed by exactly one terminal `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Token(String),
    Done,
    Error(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Token(_))
    }
}

/// What the pipeline asks of the generation backend. Model, stream flag and
/// context window are filled in by the client from its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    /// `None` uses the client's configured temperature.
    pub temperature: Option<f32>,
}

/// Inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

/// Non-streaming chat response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
    pub citations: Vec<RetrievalHit>,
}
