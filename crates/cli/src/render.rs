//! Terminal rendering of messages, citation markers and source lists.

use std::fmt::Write;

use nd_chat::RenderedMessage;
use nd_citations::ResolvedSegment;
use nd_domain::config::DisplayConfig;
use nd_domain::stream::Source;

const BOLD: &str = "\x1B[1m";
const DIM: &str = "\x1B[2m";
const CYAN: &str = "\x1B[36m";
const RESET: &str = "\x1B[0m";

fn paint(out: &mut String, color: bool, code: &str, text: &str) {
    if color {
        let _ = write!(out, "{code}{text}{RESET}");
    } else {
        out.push_str(text);
    }
}

/// One message as a block of terminal text: a header line with speaker and
/// time, the body with `[n]` markers, and optionally the source list.
pub fn render_message(msg: &RenderedMessage, display: &DisplayConfig) -> String {
    let mut out = String::new();
    let speaker = if msg.is_user { "you" } else { "newsdesk" };
    paint(&mut out, display.color, BOLD, speaker);
    out.push(' ');
    paint(&mut out, display.color, DIM, &msg.timestamp);
    out.push('\n');

    if msg.is_loading && msg.segments.is_empty() {
        paint(&mut out, display.color, DIM, "…");
        return out;
    }

    out.push_str(&render_segments(&msg.segments, display.color));

    if display.show_sources && !msg.is_user && !msg.sources.is_empty() {
        out.push_str("\n\n");
        out.push_str(render_sources(&msg.sources, display.color).trim_end());
    }
    out
}

/// Body text with citation groups drawn as `[1]` or `[1,2]`.
pub fn render_segments(segments: &[ResolvedSegment], color: bool) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            ResolvedSegment::PlainText { content } => out.push_str(content),
            ResolvedSegment::Citation { links } => {
                let numbers: Vec<String> = links.iter().map(|l| l.number.to_string()).collect();
                let marker = format!("[{}]", numbers.join(","));
                // Unresolved groups stay visible but uncoloured.
                let resolved = links.iter().any(|l| l.source.is_some());
                paint(&mut out, color && resolved, CYAN, &marker);
            }
        }
    }
    out
}

/// Numbered source list, one line per source, newline-terminated.
pub fn render_sources(sources: &[Source], color: bool) -> String {
    let mut out = String::new();
    paint(&mut out, color, BOLD, "Sources:");
    out.push('\n');
    for src in sources {
        let label = format!("[{}]", src.id);
        out.push_str("  ");
        paint(&mut out, color, CYAN, &label);
        let title = if src.title.is_empty() { &src.url } else { &src.title };
        let _ = write!(out, " {title}");
        if !src.url.is_empty() && src.url != *title {
            out.push(' ');
            paint(&mut out, color, DIM, &src.url);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nd_domain::message::Message;

    fn plain() -> DisplayConfig {
        DisplayConfig {
            show_sources: true,
            color: false,
        }
    }

    #[test]
    fn answer_with_sources() {
        let msg = Message::assistant(
            "a1",
            "Turnout was high [1, 2].\n\n## Sources\n1. [Vote](https://a.ch)\n2. [Poll](https://b.ch)",
            "18:02",
        );
        let out = render_message(&RenderedMessage::from_message(&msg), &plain());
        assert_eq!(
            out,
            "newsdesk 18:02\nTurnout was high [1,2].\n\nSources:\n  [1] Vote https://a.ch\n  [2] Poll https://b.ch"
        );
    }

    #[test]
    fn user_message_has_no_source_list() {
        let msg = Message::user("u1", "and [3]?", "18:01");
        let out = render_message(&RenderedMessage::from_message(&msg), &plain());
        assert_eq!(out, "you 18:01\nand [3]?");
    }

    #[test]
    fn hidden_sources() {
        let display = DisplayConfig {
            show_sources: false,
            color: false,
        };
        let msg = Message::assistant("a1", "Fact [1].\n\nSources:\n[A](https://a.ch)", "09:00");
        let out = render_message(&RenderedMessage::from_message(&msg), &display);
        assert!(!out.contains("https://a.ch"), "{out}");
    }

    #[test]
    fn unresolved_marker_is_not_coloured() {
        let msg = Message::assistant("a1", "Claim [7].", "09:00");
        let view = RenderedMessage::from_message(&msg);
        let out = render_segments(&view.segments, true);
        assert_eq!(out, "Claim [7].");
    }

    #[test]
    fn loading_placeholder() {
        let msg = Message::placeholder("p1", "09:00");
        let out = render_message(&RenderedMessage::from_message(&msg), &plain());
        assert_eq!(out, "newsdesk 09:00\n…");
    }

    #[test]
    fn source_without_title_shows_url_once() {
        let sources = vec![Source {
            id: 1,
            url: "https://a.ch".into(),
            title: String::new(),
        }];
        assert_eq!(render_sources(&sources, false), "Sources:\n  [1] https://a.ch\n");
    }
}
