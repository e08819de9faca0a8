use serde::Serialize;

use nd_citations::{clean_message, reconcile, resolve_segments, segment_markdown, ResolvedSegment};
use nd_domain::message::Message;
use nd_domain::stream::Source;

/// Display-ready view of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub id: String,
    pub is_user: bool,
    pub timestamp: String,
    pub is_loading: bool,
    pub is_complete: bool,
    pub display_text: String,
    pub sources: Vec<Source>,
    pub segments: Vec<ResolvedSegment>,
}

impl RenderedMessage {
    /// Build the view for `msg`.
    ///
    /// Citation and source-section handling only runs on complete
    /// assistant messages.  User messages and answers still streaming are
    /// shown as cleaned text in a single plain segment.  When reconciliation
    /// yields no sources the cleaned text is shown unchanged, heading and
    /// all.
    pub fn from_message(msg: &Message) -> Self {
        let cleaned = clean_message(&msg.text);

        let (display_text, sources, segments) = if msg.is_complete && !msg.is_user {
            let reconciled = reconcile(&cleaned, &msg.sources);
            let display_text = if reconciled.sources.is_empty() {
                cleaned
            } else {
                reconciled.display_text
            };
            let segments = resolve_segments(&segment_markdown(&display_text), &reconciled.sources);
            (display_text, reconciled.sources, segments)
        } else {
            let segments = if cleaned.is_empty() {
                Vec::new()
            } else {
                vec![ResolvedSegment::PlainText {
                    content: cleaned.clone(),
                }]
            };
            (cleaned, msg.sources.clone(), segments)
        };

        Self {
            id: msg.id.clone(),
            is_user: msg.is_user,
            timestamp: msg.timestamp.clone(),
            is_loading: msg.is_loading,
            is_complete: msg.is_complete,
            display_text,
            sources,
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nd_citations::CitationLink;

    fn answer(text: &str) -> Message {
        Message::assistant("a1", text, "10:00")
    }

    #[test]
    fn complete_answer_uses_embedded_sources() {
        let msg = answer("Rates rose [1].\n\n\n\n## Sources\n1. [Fed](https://fed.example)");
        let view = RenderedMessage::from_message(&msg);
        assert_eq!(view.display_text, "Rates rose [1].");
        assert_eq!(view.sources.len(), 1);
        assert_eq!(
            view.segments[1],
            ResolvedSegment::Citation {
                links: vec![CitationLink {
                    number: 1,
                    source: Some(view.sources[0].clone()),
                }]
            }
        );
    }

    #[test]
    fn explicit_sources_win_over_embedded() {
        let mut msg = answer("Body [1]\n## Sources\n1. [Other](http://o.com)");
        msg.sources = vec![Source {
            id: 1,
            url: "https://wire.example".into(),
            title: "Wire".into(),
        }];
        let view = RenderedMessage::from_message(&msg);
        assert_eq!(view.display_text, "Body [1]");
        assert_eq!(view.sources[0].title, "Wire");
    }

    #[test]
    fn streaming_answer_is_not_segmented() {
        let mut msg = Message::placeholder("a1", "10:00");
        msg.text = "Partial [1] and ## Sources".into();
        let view = RenderedMessage::from_message(&msg);
        assert_eq!(
            view.segments,
            vec![ResolvedSegment::PlainText {
                content: "Partial [1] and ## Sources".into()
            }]
        );
        assert!(view.is_loading);
    }

    #[test]
    fn user_message_is_plain() {
        let view = RenderedMessage::from_message(&Message::user("u1", "what about [2]?", "10:00"));
        assert_eq!(view.segments.len(), 1);
        assert!(view.sources.is_empty());
    }

    #[test]
    fn unresolvable_citation_renders_without_source() {
        let view = RenderedMessage::from_message(&answer("Claim [4]."));
        match &view.segments[1] {
            ResolvedSegment::Citation { links } => assert!(links[0].source.is_none()),
            other => panic!("expected citation, got {other:?}"),
        }
    }

    #[test]
    fn empty_placeholder_has_no_segments() {
        let view = RenderedMessage::from_message(&Message::placeholder("a1", "10:00"));
        assert!(view.segments.is_empty());
    }
}
