//! `nd-chat`: conversation state and message assembly.
//!
//! [`ChatService`] is the single writer of the [`MessageStore`].  Each
//! outbound query gets a [`RequestContext`]; every streamed event is
//! applied through it, so events from a response that outlived a session
//! reset are recognised and dropped.  Finished assistant messages are
//! turned into a [`RenderedMessage`] with reconciled sources and resolved
//! citation segments.

pub mod render;
pub mod service;
pub mod store;

pub use render::RenderedMessage;
pub use service::{ChatService, EventSink, NoopSink, FAILURE_NOTICE};
pub use store::{Applied, MessageStore, RequestContext};
