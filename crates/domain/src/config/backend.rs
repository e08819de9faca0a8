use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat backend connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the chat backend; `/api/v1/chat/...` is appended.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Whole-request timeout. Streamed answers must finish within it.
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    #[serde(default = "d_10000")]
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            timeout_ms: 60_000,
            connect_timeout_ms: 10_000,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://localhost:8000".into()
}
fn d_60000() -> u64 {
    60_000
}
fn d_10000() -> u64 {
    10_000
}
