//! Single-writer message store.
//!
//! All mutation goes through explicit transitions.  Transitions that belong
//! to a streamed response take the response's [`RequestContext`] and are
//! refused when the context's epoch no longer matches the store's (the
//! session was reset after the request went out).

use std::time::Instant;

use nd_domain::message::Message;
use nd_domain::stream::{Source, StreamEvent};
use nd_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Identity and progress of one in-flight assistant response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Store epoch the request was issued in.
    pub epoch: u64,
    /// Session the request was sent under; empty until acquired.
    pub session_id: String,
    /// Id of the assistant message being assembled.  Starts as the local
    /// placeholder id and becomes the server id on `Start`.
    pub message_id: String,
    pub chunks: usize,
    pub chars: usize,
    pub saw_end: bool,
    started: Instant,
}

impl RequestContext {
    pub fn new(epoch: u64, message_id: impl Into<String>) -> Self {
        Self {
            epoch,
            session_id: String::new(),
            message_id: message_id.into(),
            chunks: 0,
            chars: 0,
            saw_end: false,
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Outcome of applying one stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The message was updated.
    Updated,
    /// The response is finished; the message is complete.
    Finished,
    /// The request belongs to an older epoch or its message is gone.
    Stale,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    epoch: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the whole list (history load).
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Append a message that needs no further updates.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop every message and start a new epoch.  Returns the new epoch.
    pub fn reset(&mut self) -> u64 {
        self.messages.clear();
        self.epoch += 1;
        self.epoch
    }

    /// Open a response: append `placeholder` and return its context.
    pub fn begin_response(&mut self, placeholder: Message) -> RequestContext {
        let ctx = RequestContext::new(self.epoch, placeholder.id.clone());
        self.messages.push(placeholder);
        ctx
    }

    /// Apply one decoded event to the response described by `ctx`.
    pub fn apply(&mut self, ctx: &mut RequestContext, event: &StreamEvent) -> Applied {
        if self.is_stale(ctx) {
            return Applied::Stale;
        }
        let Some(idx) = self.position(&ctx.message_id) else {
            return Applied::Stale;
        };

        match event {
            StreamEvent::Start { message_id } => {
                let msg = &mut self.messages[idx];
                msg.id = message_id.clone();
                msg.text.clear();
                ctx.message_id = message_id.clone();
                Applied::Updated
            }
            StreamEvent::Context { sources } => {
                self.messages[idx].sources = Source::number_context(sources);
                Applied::Updated
            }
            StreamEvent::MessageChunk { text, .. } => {
                ctx.chunks += 1;
                ctx.chars += text.chars().count();
                self.messages[idx].text.push_str(text);
                Applied::Updated
            }
            StreamEvent::End => {
                ctx.saw_end = true;
                let msg = &mut self.messages[idx];
                msg.is_loading = false;
                msg.is_complete = true;
                Applied::Finished
            }
        }
    }

    /// Close the response normally, whether or not an `End` frame arrived.
    /// Returns the finished message, or `None` when `ctx` is stale.
    pub fn finish(&mut self, ctx: &RequestContext) -> Option<Message> {
        if self.is_stale(ctx) {
            return None;
        }
        let idx = self.position(&ctx.message_id)?;
        let msg = &mut self.messages[idx];
        msg.is_loading = false;
        msg.is_complete = true;

        TraceEvent::StreamFinished {
            message_id: ctx.message_id.clone(),
            chunks: ctx.chunks,
            chars: ctx.chars,
            sources: msg.sources.len(),
            saw_end: ctx.saw_end,
            duration_ms: ctx.elapsed_ms(),
        }
        .emit();

        Some(msg.clone())
    }

    /// Close the response after a failure and append `notice`.
    ///
    /// An empty placeholder is removed; one that already received text is
    /// kept, marked complete.  Nothing happens when `ctx` is stale.
    pub fn fail(&mut self, ctx: &RequestContext, notice: Message) -> bool {
        if self.is_stale(ctx) {
            return false;
        }
        if let Some(idx) = self.position(&ctx.message_id) {
            if self.messages[idx].text.is_empty() {
                self.messages.remove(idx);
            } else {
                let msg = &mut self.messages[idx];
                msg.is_loading = false;
                msg.is_complete = true;
            }
        }
        self.messages.push(notice);
        true
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().rposition(|m| m.id == id && !m.is_user)
    }

    fn is_stale(&self, ctx: &RequestContext) -> bool {
        if ctx.epoch == self.epoch {
            return false;
        }
        tracing::debug!(
            message_id = %ctx.message_id,
            epoch = ctx.epoch,
            current_epoch = self.epoch,
            "dropping event for a reset session"
        );
        TraceEvent::StaleEventDropped {
            message_id: ctx.message_id.clone(),
            epoch: ctx.epoch,
            current_epoch: self.epoch,
        }
        .emit();
        true
    }
}
