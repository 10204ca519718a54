use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use tutor_cli::api::{self, AppState};
use tutor_cli::{build_pipeline, telemetry};
use tutor_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init(telemetry::DEFAULT_FILTER);

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let pipeline = build_pipeline(&settings)?;

    let app = api::router(AppState { pipeline: Arc::new(pipeline) }).layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        collection = %settings.vector.collection,
        model = %settings.generation.model,
        embedding = ?settings.embedding.provider,
        "tutor-server listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
