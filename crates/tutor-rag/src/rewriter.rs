use std::sync::Arc;
use tracing::{debug, warn};

use tutor_core::traits::Generator;
use tutor_core::types::{ConversationTurn, GenerationRequest};

const REWRITE_SYSTEM: &str = "You rewrite follow-up questions into standalone search queries. \
Reply with the rewritten question only.";

/// Turns a follow-up message into a standalone query using the conversation
/// so far. Rewriting only sharpens retrieval, so any failure falls back to the
/// original message.
pub struct QueryRewriter {
    generator: Arc<dyn Generator>,
}

impl QueryRewriter {
    pub fn new(generator: Arc<dyn Generator>) -> Self { Self { generator } }

    pub async fn rewrite(&self, message: &str, history: &[ConversationTurn]) -> String {
        if history.is_empty() { return message.to_string(); }
        let request = GenerationRequest {
            system: REWRITE_SYSTEM.to_string(),
            prompt: rewrite_prompt(message, history),
            temperature: Some(0.0),
        };
        match self.generator.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                let query = text.trim().to_string();
                debug!(original = message, rewritten = %query, "rewrote query");
                query
            }
            Ok(_) => message.to_string(),
            Err(err) => {
                warn!(error = %err, "query rewrite failed; using the message as is");
                message.to_string()
            }
        }
    }
}

fn rewrite_prompt(message: &str, history: &[ConversationTurn]) -> String {
    let mut prompt = String::from(
        "Given the conversation below and a follow-up message, rewrite the follow-up \
         as a standalone question that can be understood without the conversation.\n\nConversation:\n",
    );
    for turn in history {
        prompt.push_str(&format!("{}: {}\n", turn.role.label(), turn.content));
    }
    prompt.push_str(&format!("\nFollow-up message: {message}\n\nStandalone question:"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tutor_core::traits::ByteStream;
    use tutor_core::{Error, Result};

    struct Scripted {
        calls: AtomicUsize,
        reply: Result<String>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn new(reply: Result<String>) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), reply, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Generator for Scripted {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(Error::UpstreamUnavailable(err.to_string())),
            }
        }

        async fn generate_stream(&self, _request: &GenerationRequest) -> Result<ByteStream> {
            unreachable!("rewriter never streams")
        }
    }

    #[tokio::test]
    async fn empty_history_skips_the_backend() {
        let generator = Scripted::new(Ok("should not be used".into()));
        let rewriter = QueryRewriter::new(generator.clone());
        assert_eq!(rewriter.rewrite("How do I reset my badge?", &[]).await, "How do I reset my badge?");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn history_is_sent_deterministically_and_reply_trimmed() {
        let generator = Scripted::new(Ok("  What is the refund window for online orders?\n".into()));
        let rewriter = QueryRewriter::new(generator.clone());
        let history = vec![
            ConversationTurn::user("Tell me about online orders"),
            ConversationTurn::assistant("Online orders ship within two days."),
        ];

        let query = rewriter.rewrite("and refunds?", &history).await;

        assert_eq!(query, "What is the refund window for online orders?");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].temperature, Some(0.0));
        assert!(seen[0].prompt.contains("USER: Tell me about online orders"));
        assert!(seen[0].prompt.contains("ASSISTANT: Online orders ship within two days."));
        assert!(seen[0].prompt.contains("Follow-up message: and refunds?"));
    }

    #[tokio::test]
    async fn blank_reply_falls_back_to_message() {
        let rewriter = QueryRewriter::new(Scripted::new(Ok("   ".into())));
        assert_eq!(rewriter.rewrite("and refunds?", &[ConversationTurn::user("hi")]).await, "and refunds?");
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_message() {
        let generator = Scripted::new(Err(Error::UpstreamUnavailable("connection refused".into())));
        let rewriter = QueryRewriter::new(generator.clone());
        assert_eq!(rewriter.rewrite("and refunds?", &[ConversationTurn::user("hi")]).await, "and refunds?");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
