use axum::body::Body;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};

use tutor_core::config::GenerationSettings;
use tutor_core::traits::Generator;
use tutor_core::types::GenerationRequest;
use tutor_core::Error;
use tutor_generate::OllamaGenerator;

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn generator(url: String) -> OllamaGenerator {
    let settings = GenerationSettings { url, model: "llama3".into(), temperature: 0.3, context_window: 2048, timeout_secs: 5 };
    OllamaGenerator::new(settings).unwrap()
}

fn request(temperature: Option<f32>) -> GenerationRequest {
    GenerationRequest { system: "be brief".into(), prompt: "USER: hi".into(), temperature }
}

#[tokio::test]
async fn generate_sends_model_options_and_returns_response_text() {
    let router = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "llama3");
            assert_eq!(body["system"], "be brief");
            assert_eq!(body["prompt"], "USER: hi");
            assert_eq!(body["stream"], false);
            assert_eq!(body["options"]["temperature"], 0.0);
            assert_eq!(body["options"]["num_ctx"], 2048);
            Json(json!({ "model": "llama3", "response": "Hello there.", "done": true }))
        }),
    );
    let text = generator(spawn_backend(router).await).generate(&request(Some(0.0))).await.unwrap();
    assert_eq!(text, "Hello there.");
}

#[tokio::test]
async fn generate_without_response_field_is_unexpected() {
    let router = Router::new().route("/api/generate", post(|| async { Json(json!({ "done": true })) }));
    let err = generator(spawn_backend(router).await).generate(&request(None)).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedFormat(_)), "{err}");
}

#[tokio::test]
async fn generate_maps_server_errors_to_upstream_unavailable() {
    let router = Router::new().route(
        "/api/generate",
        post(|| async { (StatusCode::NOT_FOUND, "model 'llama3' not found") }),
    );
    let err = generator(spawn_backend(router).await).generate(&request(None)).await.unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable(ref m) if m.contains("not found")), "{err}");
}

#[tokio::test]
async fn generate_stream_passes_raw_bytes_through() {
    let router = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["stream"], true);
            let temperature = body["options"]["temperature"].as_f64().unwrap();
            assert!((temperature - 0.3).abs() < 1e-6);
            let parts = vec![
                Ok::<_, std::io::Error>(Bytes::from_static(b"{\"response\":\"Hel")),
                Ok(Bytes::from_static(b"lo\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n")),
            ];
            Body::from_stream(futures::stream::iter(parts))
        }),
    );
    let mut stream = generator(spawn_backend(router).await).generate_stream(&request(None)).await.unwrap();
    let mut raw = Vec::new();
    while let Some(chunk) = stream.next().await {
        raw.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(
        String::from_utf8(raw).unwrap(),
        "{\"response\":\"Hello\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n"
    );
}
