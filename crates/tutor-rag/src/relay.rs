//! Streaming relay.
//!
//! The generation backend answers with newline-delimited JSON records whose
//! boundaries do not line up with network writes. `StreamRelay` is the
//! per-request state machine that buffers the unterminated tail, parses each
//! complete record and turns it into `StreamEvent`s. It has no I/O of its own;
//! `relay_stream` drives it from a live byte stream.
//!
//! States move strictly forward:
//!
//! ```text
//! AwaitingData --token--> Forwarding --done/end/error--> Terminated
//!      \___________________done/end/error___________________/
//! ```
//!
//! Malformed records are dropped without ending the stream. Every drop is
//! logged and counted (`dropped_records`), so a flaky upstream shows up in the
//! logs instead of silently losing text.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use tutor_core::traits::ByteStream;
use tutor_core::types::StreamEvent;
use tutor_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingData,
    Forwarding,
    Terminated,
}

/// One signal from the upstream connection.
#[derive(Debug, Clone)]
pub enum RelayInput {
    Data(Bytes),
    /// Upstream closed normally.
    End,
    /// Upstream transport failed.
    Failed(String),
}

#[derive(Debug, Deserialize)]
struct UpstreamRecord {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug)]
pub struct StreamRelay {
    state: RelayState,
    buffer: Vec<u8>,
    dropped: usize,
}

impl Default for StreamRelay {
    fn default() -> Self { Self::new() }
}

impl StreamRelay {
    pub fn new() -> Self {
        Self { state: RelayState::AwaitingData, buffer: Vec::new(), dropped: 0 }
    }

    pub fn state(&self) -> RelayState { self.state }

    pub fn is_terminated(&self) -> bool { self.state == RelayState::Terminated }

    /// Malformed records discarded so far.
    pub fn dropped_records(&self) -> usize { self.dropped }

    /// Bytes held back waiting for a record delimiter.
    pub fn buffered_len(&self) -> usize { self.buffer.len() }

    /// Transition function. Returns the events produced by `input`, in order.
    /// Once terminated, every input is discarded and nothing is returned.
    pub fn feed(&mut self, input: RelayInput) -> Vec<StreamEvent> {
        if self.is_terminated() {
            if let RelayInput::Data(bytes) = &input {
                debug!(bytes = bytes.len(), "discarding data after termination");
            }
            return Vec::new();
        }
        match input {
            RelayInput::Data(bytes) => {
                self.buffer.extend_from_slice(&bytes);
                self.drain_complete_records()
            }
            RelayInput::End => {
                let mut events = self.drain_tail();
                events.extend(self.terminate(StreamEvent::Done));
                events
            }
            RelayInput::Failed(message) => self.terminate(StreamEvent::Error(message)),
        }
    }

    fn drain_complete_records(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.apply_line(&line[..pos], &mut events);
            if self.is_terminated() { break; }
        }
        events
    }

    // A final record may arrive without its trailing newline.
    fn drain_tail(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let tail = std::mem::take(&mut self.buffer);
        self.apply_line(&tail, &mut events);
        events
    }

    fn apply_line(&mut self, line: &[u8], events: &mut Vec<StreamEvent>) {
        if line.iter().all(u8::is_ascii_whitespace) { return; }
        match parse_record(line) {
            Ok(record) => {
                if let Some(message) = record.error {
                    events.extend(self.terminate(StreamEvent::Error(message)));
                    return;
                }
                if let Some(text) = record.response.filter(|t| !t.is_empty()) {
                    self.state = RelayState::Forwarding;
                    events.push(StreamEvent::Token(text));
                }
                if record.done {
                    events.extend(self.terminate(StreamEvent::Done));
                }
            }
            Err(err) => {
                self.dropped += 1;
                warn!(error = %err, dropped = self.dropped, "dropping malformed upstream record");
            }
        }
    }

    fn terminate(&mut self, event: StreamEvent) -> Vec<StreamEvent> {
        if self.is_terminated() { return Vec::new(); }
        self.state = RelayState::Terminated;
        self.buffer = Vec::new();
        debug!(dropped = self.dropped, terminal = ?event, "relay terminated");
        vec![event]
    }
}

fn parse_record(line: &[u8]) -> Result<UpstreamRecord> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    serde_json::from_slice(line).map_err(|e| {
        let preview: String = String::from_utf8_lossy(line).chars().take(80).collect();
        Error::MalformedRecord(format!("{e}: {preview}"))
    })
}

struct DisconnectGuard {
    finished: bool,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!("event stream dropped before termination; upstream closed");
        }
    }
}

/// Drives a `StreamRelay` from `upstream`. The returned stream ends right
/// after its terminal event. Dropping it early drops `upstream` too, closing
/// the backend connection.
pub fn relay_stream(mut upstream: ByteStream) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let mut guard = DisconnectGuard { finished: false };
        let mut relay = StreamRelay::new();
        while !relay.is_terminated() {
            let input = match upstream.next().await {
                Some(Ok(bytes)) => RelayInput::Data(bytes),
                Some(Err(err)) => RelayInput::Failed(err.to_string()),
                None => RelayInput::End,
            };
            for event in relay.feed(input) {
                yield event;
            }
        }
        drop(upstream);
        guard.finished = true;
    }
}
