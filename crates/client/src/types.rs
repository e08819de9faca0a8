//! Wire DTOs for the chat backend.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/chat/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

/// Response of `POST /api/v1/chat/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

/// Response of `GET /api/v1/chat/history/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ChatHistoryMessage>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryMessage {
    pub id: String,
    pub role: HistoryRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Ai,
    #[serde(other)]
    Other,
}
