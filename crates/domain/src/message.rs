use serde::{Deserialize, Serialize};

use crate::stream::Source;

/// One entry in the conversation as held by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Accumulated text. For assistant messages this grows chunk by chunk.
    pub text: String,
    pub is_user: bool,
    /// Display timestamp, `HH:MM`.
    pub timestamp: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_loading: bool,
}

impl Message {
    /// A finished message sent by the user.
    pub fn user(id: impl Into<String>, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_user: true,
            timestamp: timestamp.into(),
            sources: Vec::new(),
            is_complete: true,
            is_loading: false,
        }
    }

    /// An empty assistant placeholder awaiting a streamed answer.
    pub fn placeholder(id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
            is_user: false,
            timestamp: timestamp.into(),
            sources: Vec::new(),
            is_complete: false,
            is_loading: true,
        }
    }

    /// A finished assistant message (history entries, error notices).
    pub fn assistant(id: impl Into<String>, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_user: false,
            timestamp: timestamp.into(),
            sources: Vec::new(),
            is_complete: true,
            is_loading: false,
        }
    }
}
