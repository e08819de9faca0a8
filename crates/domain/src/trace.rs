use serde::Serialize;

/// Structured trace events emitted across all newsdesk crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
    },
    SessionReset {
        old_session_id: Option<String>,
    },
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    HistoryLoaded {
        session_id: String,
        messages: usize,
        dropped_empty: usize,
    },
    StreamStarted {
        session_id: String,
        message_id: String,
    },
    StreamFinished {
        message_id: String,
        chunks: usize,
        chars: usize,
        sources: usize,
        saw_end: bool,
        duration_ms: u64,
    },
    MalformedFrame {
        error: String,
        line_chars: usize,
    },
    StaleEventDropped {
        message_id: String,
        epoch: u64,
        current_epoch: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "nd_event");
    }
}
