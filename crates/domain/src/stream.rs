use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for streamed chat responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Role string the backend uses for assistant frames.
pub const ASSISTANT_ROLE: &str = "ai";

/// Whether a frame's declared role identifies the assistant.
pub fn is_assistant_role(role: &str) -> bool {
    role.eq_ignore_ascii_case(ASSISTANT_ROLE) || role.eq_ignore_ascii_case("assistant")
}

/// Typed events decoded from a streamed chat response.
///
/// The decoder emits these in arrival order; ordering contracts
/// (one `Start`, at most one `Context`, a terminal `End`) belong to the
/// consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// The backend assigned an id to the answer being streamed.
    #[serde(rename = "start")]
    Start { message_id: String },

    /// Retrieved articles backing the answer.
    #[serde(rename = "context")]
    Context { sources: Vec<ContextSource> },

    /// A piece of assistant text.
    #[serde(rename = "message_chunk")]
    MessageChunk { text: String, role: String },

    /// The response is finished.
    #[serde(rename = "end")]
    End,
}

/// A source as delivered by a `CONTEXT` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
}

/// A numbered source attached to one assistant message.
///
/// Ids are 1-based and unique within a message's source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: u32,
    pub url: String,
    pub title: String,
}

impl Source {
    /// Number explicit context sources `1..=n` in arrival order.
    pub fn number_context(sources: &[ContextSource]) -> Vec<Source> {
        sources
            .iter()
            .zip(1u32..)
            .map(|(src, id)| Source {
                id,
                url: src.url.clone(),
                title: src.title.clone(),
            })
            .collect()
    }
}
