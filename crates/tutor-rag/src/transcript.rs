//! Client-side reassembly of the server's event stream.
//!
//! `FrameDecoder` cuts the incoming bytes into SSE frames, `Frame::to_event`
//! maps them back to `StreamEvent`s and `Transcript` joins the token fragments
//! into display text.

use tutor_core::types::StreamEvent;

/// Event tag of a token frame. Tagged frames are always tokens, so a
/// fragment that reads `[DONE]` is not mistaken for the end of the stream.
pub const TOKEN_EVENT: &str = "token";
/// Data value of the untagged frame that closes a successful stream.
pub const DONE_SENTINEL: &str = "[DONE]";
/// Event tag of the frame that carries a stream error.
pub const ERROR_EVENT: &str = "error";

const NO_SPACE_BEFORE: &[char] = &['.', ',', '!', '?', '*', ':'];

/// Appends `next` to `accumulated`, inserting a single space unless `next`
/// starts with whitespace or one of `. , ! ? * :`.
pub fn join_fragment(accumulated: &str, next: &str) -> String {
    let glue = match next.chars().next() {
        _ if accumulated.is_empty() => "",
        None => "",
        Some(c) if c.is_whitespace() || NO_SPACE_BEFORE.contains(&c) => "",
        Some(_) => " ",
    };
    format!("{accumulated}{glue}{next}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: String,
}

impl Frame {
    pub fn to_event(&self) -> StreamEvent {
        match self.event.as_deref() {
            Some(ERROR_EVENT) => StreamEvent::Error(self.data.clone()),
            Some(TOKEN_EVENT) => StreamEvent::Token(self.data.clone()),
            _ if self.data == DONE_SENTINEL => StreamEvent::Done,
            _ => StreamEvent::Token(self.data.clone()),
        }
    }

    fn parse(block: &str) -> Option<Frame> {
        let mut frame = Frame::default();
        let mut data_lines: Vec<&str> = Vec::new();
        for line in block.split('\n') {
            if line.is_empty() || line.starts_with(':') { continue; }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => frame.event = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => {}
            }
        }
        if data_lines.is_empty() && frame.event.is_none() { return None; }
        frame.data = data_lines.join("\n");
        Some(frame)
    }
}

/// Incremental SSE frame decoder. Bytes of an unfinished frame stay buffered
/// until the blank line that closes it arrives.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(frame) = Frame::parse(&String::from_utf8_lossy(&block[..pos])) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a final frame that was not closed by a blank line.
    pub fn finish(&mut self) -> Option<Frame> {
        let block = std::mem::take(&mut self.buffer);
        Frame::parse(&String::from_utf8_lossy(&block))
    }
}

/// Display text of one streamed answer.
#[derive(Debug, Default)]
pub struct Transcript {
    text: String,
    terminal: Option<StreamEvent>,
}

impl Transcript {
    pub fn new() -> Self { Self::default() }

    /// Applies one event and returns the text appended to the display, if any.
    /// Events after the terminal one are ignored.
    pub fn push(&mut self, event: StreamEvent) -> Option<String> {
        if self.terminal.is_some() { return None; }
        match event {
            StreamEvent::Token(fragment) => {
                let before = self.text.len();
                self.text = join_fragment(&self.text, &fragment);
                Some(self.text[before..].to_string())
            }
            terminal => {
                self.terminal = Some(terminal);
                None
            }
        }
    }

    pub fn text(&self) -> &str { &self.text }

    pub fn is_finished(&self) -> bool { self.terminal.is_some() }

    pub fn error(&self) -> Option<&str> {
        match &self.terminal {
            Some(StreamEvent::Error(message)) => Some(message),
            _ => None,
        }
    }

    pub fn into_text(self) -> String { self.text }
}
