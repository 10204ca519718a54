//! HTTP surface of `tutor-server`.
//!
//! - `POST /chat/stream`: server-sent events, one `event: token` frame per
//!   token fragment, an untagged `data: [DONE]` on completion, `event: error`
//!   on failure
//! - `POST /chat`: `{ answer, citations }`
//! - `GET /health`

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde_json::json;
use tracing::warn;

use tutor_core::types::{ChatAnswer, ChatRequest, StreamEvent};
use tutor_core::Error;
use tutor_rag::transcript::{DONE_SENTINEL, ERROR_EVENT, TOKEN_EVENT};
use tutor_rag::RagPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(state)
}

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self { Self(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UnexpectedFormat(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::BAD_REQUEST {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Result<Json<ChatAnswer>, ApiError> {
    Ok(Json(state.pipeline.answer(&request).await?))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let events = state.pipeline.stream(&request).await?;
    let frames = events.map(|event| Ok(to_frame(event)));
    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}

/// SSE fields cannot carry CR, so line endings are folded into `\n` (which
/// becomes a multi-line `data` field and decodes back to `\n`).
pub fn to_frame(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Token(fragment) => Event::default().event(TOKEN_EVENT).data(without_cr(&fragment)),
        StreamEvent::Done => Event::default().data(DONE_SENTINEL),
        StreamEvent::Error(message) => Event::default().event(ERROR_EVENT).data(without_cr(&message)),
    }
}

fn without_cr(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
