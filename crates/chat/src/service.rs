//! Conversation orchestration: session, history, send, reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;

use nd_client::{ChatBackend, ChatHistory, HistoryRole};
use nd_domain::error::{Error, Result};
use nd_domain::message::Message;
use nd_domain::stream::StreamEvent;
use nd_domain::trace::TraceEvent;
use nd_sessions::{format_api_timestamp, format_timestamp, SessionCreator, SessionManager, TokenStore};

use crate::render::RenderedMessage;
use crate::store::{Applied, MessageStore, RequestContext};

/// Assistant message appended when a send fails.
pub const FAILURE_NOTICE: &str =
    "Sorry, there was an error processing your request. Please try again.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event sink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives each stream event after it has been applied to the store,
/// for live display.
pub trait EventSink {
    fn on_event(&mut self, event: &StreamEvent);
}

impl<F: FnMut(&StreamEvent)> EventSink for F {
    fn on_event(&mut self, event: &StreamEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&mut self, _event: &StreamEvent) {}
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session creation through the backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct BackendSessions(Arc<dyn ChatBackend>);

#[async_trait]
impl SessionCreator for BackendSessions {
    async fn create_session(&self) -> Result<String> {
        self.0.create_session().await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-flight guard
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Marks a send as in flight; cleared on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The chat client's conversation state.
///
/// One send at a time: a second `send_message` while a response is
/// streaming fails with [`Error::Busy`] instead of interleaving.
pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    sessions: SessionManager,
    store: Mutex<MessageStore>,
    in_flight: AtomicBool,
}

impl ChatService {
    pub fn new(backend: Arc<dyn ChatBackend>, tokens: TokenStore) -> Self {
        let sessions = SessionManager::new(tokens, Arc::new(BackendSessions(backend.clone())));
        Self {
            backend,
            sessions,
            store: Mutex::new(MessageStore::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Snapshot of the conversation.
    pub fn messages(&self) -> Vec<Message> {
        self.store.lock().messages().to_vec()
    }

    /// Snapshot of the conversation, rendered for display.
    pub fn rendered(&self) -> Vec<RenderedMessage> {
        self.store
            .lock()
            .messages()
            .iter()
            .map(RenderedMessage::from_message)
            .collect()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Make sure a session exists and load its history.
    pub async fn init(&self) -> Result<()> {
        self.load_history().await.map(|_| ())
    }

    /// Replace the conversation with the backend's history for the current
    /// session.
    ///
    /// Session acquisition errors propagate.  A failed history fetch is
    /// logged and leaves an empty conversation; `Ok(None)` reports it.
    pub async fn load_history(&self) -> Result<Option<usize>> {
        let epoch = self.store.lock().epoch();
        let session_id = self.sessions.get_or_create_session().await?;

        let messages = match self.backend.fetch_history(&session_id).await {
            Ok(history) => Some(history_messages(&history)),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "failed to fetch chat history");
                None
            }
        };

        let mut store = self.store.lock();
        if store.epoch() != epoch {
            tracing::debug!("session reset during history load, discarding result");
            return Ok(None);
        }

        match messages {
            Some((messages, dropped_empty)) => {
                let count = messages.len();
                store.replace_all(messages);
                TraceEvent::HistoryLoaded {
                    session_id,
                    messages: count,
                    dropped_empty,
                }
                .emit();
                Ok(Some(count))
            }
            None => {
                store.replace_all(Vec::new());
                Ok(None)
            }
        }
    }

    /// Send `text` and assemble the streamed answer.
    ///
    /// The user message and a loading placeholder are appended first.  On
    /// any failure the placeholder is cleared, [`FAILURE_NOTICE`] is
    /// appended, and the error is returned.
    pub async fn send_message<S>(&self, text: &str, sink: &mut S) -> Result<RenderedMessage>
    where
        S: EventSink + ?Sized,
    {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Other("message is empty".into()));
        }
        let _flight = InFlight::acquire(&self.in_flight)?;

        let now = format_timestamp();
        let mut ctx = {
            let mut store = self.store.lock();
            store.push(Message::user(local_id(), text, now.clone()));
            store.begin_response(Message::placeholder(local_id(), now))
        };

        let outcome = self.stream_response(&mut ctx, text, sink).await;

        let mut store = self.store.lock();
        match outcome {
            Ok(()) => match store.finish(&ctx) {
                Some(msg) => Ok(RenderedMessage::from_message(&msg)),
                None => Err(Error::Session(
                    "session was reset while the answer was streaming".into(),
                )),
            },
            Err(e) => {
                tracing::warn!(
                    message_id = %ctx.message_id,
                    session_id = %ctx.session_id,
                    error = %e,
                    "send failed"
                );
                store.fail(&ctx, Message::assistant(local_id(), FAILURE_NOTICE, format_timestamp()));
                Err(e)
            }
        }
    }

    async fn stream_response<S>(&self, ctx: &mut RequestContext, text: &str, sink: &mut S) -> Result<()>
    where
        S: EventSink + ?Sized,
    {
        let session_id = self.sessions.get_or_create_session().await?;
        ctx.session_id = session_id.clone();

        // A reset while the session was being acquired must not send this
        // question under the next session.
        if self.store.lock().epoch() != ctx.epoch {
            return Err(Error::Session(
                "session was reset before the question was sent".into(),
            ));
        }

        let mut events = self.backend.query(&session_id, text).await?;

        TraceEvent::StreamStarted {
            session_id,
            message_id: ctx.message_id.clone(),
        }
        .emit();

        while let Some(item) = events.next().await {
            let event = item?;
            let applied = self.store.lock().apply(ctx, &event);
            match applied {
                Applied::Stale => return Ok(()),
                Applied::Updated => sink.on_event(&event),
                Applied::Finished => {
                    sink.on_event(&event);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Forget the session, clear the conversation, and start a fresh
    /// session.  Responses still streaming for the old session are
    /// ignored from here on.
    pub async fn reset_session(&self) -> Result<()> {
        self.sessions.reset_session()?;
        let epoch = self.store.lock().reset();
        tracing::info!(epoch, "conversation reset");
        self.init().await
    }
}

/// Convert backend history to store messages.  Blank entries are dropped;
/// returns the messages and how many were dropped.
fn history_messages(history: &ChatHistory) -> (Vec<Message>, usize) {
    let mut dropped = 0;
    let messages = history
        .messages
        .iter()
        .filter(|m| {
            let keep = !m.content.trim().is_empty();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .map(|m| {
            let timestamp = format_api_timestamp(&m.timestamp);
            if m.role == HistoryRole::User {
                Message::user(m.id.clone(), m.content.clone(), timestamp)
            } else {
                Message::assistant(m.id.clone(), m.content.clone(), timestamp)
            }
        })
        .collect();
    (messages, dropped)
}

fn local_id() -> String {
    format!("local-{}", uuid::Uuid::new_v4())
}
