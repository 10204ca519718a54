use std::env;

use tracing::info;

use tutor_cli::{build_retrieval, telemetry};
use tutor_core::config::{resolve_with_base, Config};
use tutor_core::data_processor::{ChunkingConfig, DataProcessor};
use tutor_vector::VectorIndexer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init(telemetry::DEFAULT_FILTER);
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None; let mut limit = None;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--limit" | "-l" => { match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) { Some(n) => { limit = Some(n); i += 1; } None => { eprintln!("Error: --limit requires a number"); std::process::exit(1); } } }
        "--help" | "-h" => { println!("Usage: tutor-ingest [data_dir] [--limit N]"); return Ok(()); }
        _ if !args[i].starts_with('-') => data_dir = Some(args[i].clone()), _ => {} } i += 1; }
    let data_dir = resolve_with_base(&env::current_dir()?, data_dir.unwrap_or_else(|| settings.ingest.data_dir.clone()));

    println!("Training Material Ingestion\n===========================");
    println!("Data directory: {}", data_dir.display());
    println!("Collection: {} ({} dims)", settings.vector.collection, settings.embedding.dimension);

    let processor = DataProcessor::with_config(ChunkingConfig { max_chars: settings.ingest.max_chars, overlap: settings.ingest.overlap });
    let chunks = match limit {
        Some(n) => { println!("🔢 Limiting ingestion to {} files", n); processor.process_directory_limited(&data_dir, n)? }
        None => processor.process_directory(&data_dir)?,
    };
    if chunks.is_empty() {
        println!("No .txt files found under {}", data_dir.display());
        return Ok(());
    }

    let (embedder, store) = build_retrieval(&settings)?;
    let indexer = VectorIndexer::new(store, embedder, settings.embedding.batch_size);
    let written = indexer.index_chunks(&chunks).await?;
    info!(points = written, collection = %settings.vector.collection, "ingestion finished");

    println!("\n✅ Ingestion completed successfully!");
    println!("📊 Upserted {} chunks into '{}'", written, settings.vector.collection);
    println!("\n💡 Start the server with: cargo run --bin tutor-server");
    Ok(())
}
