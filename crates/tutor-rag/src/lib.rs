//! tutor-rag
//!
//! Retrieval-augmented answering: query rewriting, context assembly, prompt
//! construction, the streaming relay that turns raw generation output into
//! `StreamEvent`s, and the client-side transcript reassembly.

pub mod context;
pub mod pipeline;
pub mod prompt;
pub mod relay;
pub mod rewriter;
pub mod transcript;

pub use context::{ContextBlock, ContextEntry};
pub use pipeline::{PreparedPrompt, RagPipeline};
pub use relay::{relay_stream, RelayInput, RelayState, StreamRelay};
pub use rewriter::QueryRewriter;
pub use transcript::{join_fragment, Frame, FrameDecoder, Transcript};
