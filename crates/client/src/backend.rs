use async_trait::async_trait;

use nd_domain::error::Result;
use nd_domain::stream::{BoxStream, StreamEvent};

use crate::types::ChatHistory;

/// The chat backend's HTTP surface, as the client consumes it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /api/v1/chat/session`: mint a new session id.
    async fn create_session(&self) -> Result<String>;

    /// `GET /api/v1/chat/history/{session_id}`.
    async fn fetch_history(&self, session_id: &str) -> Result<ChatHistory>;

    /// `POST /api/v1/chat/query`: send a message and stream the answer.
    ///
    /// A non-success status fails here; read failures after that surface
    /// as a terminal `Err` item in the stream.
    async fn query(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;
}
