//! Line-framed event decoder.
//!
//! Frames are delimited by `\n`.  Lines are cut from a byte buffer before
//! any UTF-8 decoding happens, so a multi-byte character split across two
//! transport chunks is reassembled rather than replaced.  Each complete,
//! non-blank line is an optional `data:` prefix followed by one JSON
//! object with a `type` discriminator.

use serde::Deserialize;

use nd_domain::stream::{is_assistant_role, ContextSource, StreamEvent};
use nd_domain::trace::TraceEvent;

/// The JSON object carried by one frame.  Every field is optional so that
/// frames of unknown types still deserialize and can be ignored.
#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    context_sources: Option<Vec<ContextSource>>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Incremental decoder for one streamed response.
///
/// Feed it every chunk the transport delivers with [`decode`], then call
/// [`finish`] once the body closes to flush a trailing unterminated line.
///
/// [`decode`]: FrameDecoder::decode
/// [`finish`]: FrameDecoder::finish
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    frames: usize,
    malformed: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and decode every complete line now in the buffer.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let lines = drain_lines(&mut self.buffer);
        self.decode_lines(lines)
    }

    /// Decode whatever is left in the buffer as a final line.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest).into_owned();
        self.decode_lines(vec![line])
    }

    /// Non-blank lines seen so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Lines that were discarded because they were not valid JSON frames.
    pub fn malformed_frames(&self) -> usize {
        self.malformed
    }

    /// Bytes currently held back waiting for a line terminator.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn decode_lines(&mut self, lines: Vec<String>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.frames += 1;
            match parse_frame(line) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => {
                    self.malformed += 1;
                    tracing::warn!(error = %e, line = %line, "skipping malformed stream frame");
                    TraceEvent::MalformedFrame {
                        error: e.to_string(),
                        line_chars: line.chars().count(),
                    }
                    .emit();
                }
            }
        }
        events
    }
}

/// Remove every complete `\n`-terminated line from the front of `buffer`.
///
/// The trailing partial line, if any, stays in the buffer.  `\n` is never
/// part of a multi-byte UTF-8 sequence, so cutting on the raw byte is safe.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = buffer.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };

    let complete: Vec<u8> = buffer.drain(..=last_newline).collect();
    complete
        .split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect()
}

/// Parse one trimmed, non-blank frame line.
///
/// Returns `Ok(None)` for frames that are valid but carry nothing to
/// forward: unknown types, `START` without an id, non-assistant messages.
pub fn parse_frame(line: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
    let json = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line,
    };

    let frame: WireFrame = serde_json::from_str(json)?;

    let event = match frame.kind.as_deref() {
        Some("START") => match frame.message_id {
            Some(message_id) => Some(StreamEvent::Start { message_id }),
            None => {
                tracing::debug!("START frame without message_id, ignoring");
                None
            }
        },
        Some("CONTEXT") => Some(StreamEvent::Context {
            sources: frame.context_sources.unwrap_or_default(),
        }),
        Some("MESSAGE") => match frame.role {
            Some(role) if is_assistant_role(&role) => Some(StreamEvent::MessageChunk {
                text: frame.message.unwrap_or_default(),
                role,
            }),
            other => {
                tracing::trace!(role = ?other, "dropping non-assistant MESSAGE frame");
                None
            }
        },
        Some("END") => Some(StreamEvent::End),
        other => {
            tracing::debug!(kind = ?other, "ignoring frame of unknown type");
            None
        }
    };

    Ok(event)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
