use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session token storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding `session.json` and the REPL history file.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Key under which the session token is stored.
    #[serde(default = "d_storage_key")]
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            storage_key: d_storage_key(),
        }
    }
}

fn d_state_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".newsdesk")
}
fn d_storage_key() -> String {
    "chat_session_id".into()
}
