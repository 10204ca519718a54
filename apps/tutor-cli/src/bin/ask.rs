use std::env;
use std::io::{self, Write};

use futures::StreamExt;

use tutor_cli::telemetry;
use tutor_core::config::Config;
use tutor_core::types::{ChatRequest, ConversationTurn};
use tutor_rag::{FrameDecoder, Transcript};

/// Interactive chat client for a running tutor-server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("warn");
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut base_url = format!("http://127.0.0.1:{}", settings.server.port);
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--url" | "-u" => { match args.get(i + 1) { Some(url) => { base_url = url.trim_end_matches('/').to_string(); i += 1; } None => { eprintln!("Error: --url requires a value"); std::process::exit(1); } } }
        _ => {} } i += 1; }

    println!("💬 Training Assistant");
    println!("=====================");
    println!("Server: {}", base_url);
    println!();
    show_help();

    let client = reqwest::Client::new();
    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 { break; }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "/help" | "/h" => show_help(),
            "/reset" | "/r" => {
                history.clear();
                println!("🧹 Conversation cleared");
            }
            "/quit" | "/q" | "/exit" => {
                println!("👋 Goodbye!");
                break;
            }
            message => match ask(&client, &base_url, message, &history).await {
                Ok(answer) => {
                    history.push(ConversationTurn::user(message));
                    history.push(ConversationTurn::assistant(answer));
                }
                Err(e) => println!("❌ {}", e),
            },
        }
        println!();
    }

    Ok(())
}

/// Streams one answer to stdout and returns its full text.
async fn ask(client: &reqwest::Client, base_url: &str, message: &str, history: &[ConversationTurn]) -> anyhow::Result<String> {
    let request = ChatRequest { message: message.to_string(), history: history.to_vec() };
    let response = client.post(format!("{}/chat/stream", base_url)).json(&request).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        anyhow::bail!("server returned {}: {}", status, body["error"].as_str().unwrap_or("no details"));
    }

    print!("assistant> ");
    let mut decoder = FrameDecoder::new();
    let mut transcript = Transcript::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        for frame in decoder.push(&chunk?) {
            if let Some(delta) = transcript.push(frame.to_event()) {
                print!("{}", delta);
                io::stdout().flush()?;
            }
        }
        if transcript.is_finished() { break; }
    }
    if let Some(frame) = decoder.finish() {
        if let Some(delta) = transcript.push(frame.to_event()) { print!("{}", delta); }
    }
    println!();

    if let Some(error) = transcript.error() {
        anyhow::bail!("answer interrupted: {}", error);
    }
    if !transcript.is_finished() {
        anyhow::bail!("connection closed before the answer completed");
    }
    Ok(transcript.into_text())
}

fn show_help() {
    println!("🎯 Commands:");
    println!("  /help     - Show this help message");
    println!("  /reset    - Forget the conversation so far");
    println!("  /quit     - Exit");
    println!("  <message> - Ask the training assistant");
    println!();
}
