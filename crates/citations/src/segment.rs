//! Citation segmentation.
//!
//! A citation marker is `[` digits (`,` optional spaces digits)* `]` that
//! is *not* immediately followed by `(`.  The exclusion keeps markdown
//! links such as `[3](https://...)` intact.  The `regex` crate has no
//! look-ahead, so the `(` check happens after each match.

use std::ops::Range;
use std::sync::OnceLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;

use nd_domain::stream::Source;

fn marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+(?:,\s*\d+)*)\]").expect("valid citation pattern"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Segments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One piece of a segmented text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    PlainText { content: String },
    CitationRef { numbers: Vec<u32> },
}

impl Segment {
    fn plain(content: impl Into<String>) -> Self {
        Self::PlainText {
            content: content.into(),
        }
    }
}

/// Split one prose text run into plain text and citation markers.
///
/// With no markers the whole text comes back as a single `PlainText`; an
/// empty input yields no segments.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain_start = 0;

    for caps in marker_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("capture 0 always present");

        if text[whole.end()..].starts_with('(') {
            continue;
        }

        let numbers: Vec<u32> = caps[1]
            .split(',')
            .filter_map(|n| n.trim().parse().ok())
            .collect();
        if numbers.is_empty() {
            continue;
        }

        if whole.start() > plain_start {
            segments.push(Segment::plain(&text[plain_start..whole.start()]));
        }
        segments.push(Segment::CitationRef { numbers });
        plain_start = whole.end();
    }

    if plain_start < text.len() {
        segments.push(Segment::plain(&text[plain_start..]));
    }

    segments
}

/// Segment a markdown body, leaving code untouched.
///
/// The body is parsed with `pulldown-cmark`; only text nodes outside code
/// blocks are scanned for markers, with contiguous text nodes joined first
/// because the parser splits prose at brackets.  Everything else (markup,
/// inline code, fenced or indented code blocks) comes back verbatim as
/// `PlainText`, so the segments still concatenate to the source text.
pub fn segment_markdown(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for run in prose_runs(text) {
        if run.start > cursor {
            segments.push(Segment::plain(&text[cursor..run.start]));
        }
        segments.extend(segment(&text[run.clone()]));
        cursor = run.end;
    }
    if cursor < text.len() {
        segments.push(Segment::plain(&text[cursor..]));
    }
    merge_plain(segments)
}

/// Byte ranges of prose text outside code, adjacent text nodes joined.
fn prose_runs(text: &str) -> Vec<Range<usize>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut runs: Vec<Range<usize>> = Vec::new();
    let mut in_code_block = false;

    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(_) if !in_code_block => match runs.last_mut() {
                Some(last) if last.end == range.start => last.end = range.end,
                Some(last) if range.start < last.end => {}
                _ => runs.push(range),
            },
            _ => {}
        }
    }
    runs
}

fn merge_plain(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Segment::PlainText { content: next } = &seg {
            if let Some(Segment::PlainText { content }) = merged.last_mut() {
                content.push_str(next);
                continue;
            }
        }
        merged.push(seg);
    }
    merged
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution against the source list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Look up a citation number by exact source id.
pub fn resolve(number: u32, sources: &[Source]) -> Option<&Source> {
    sources.iter().find(|src| src.id == number)
}

/// One number inside a resolved citation marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationLink {
    pub number: u32,
    /// `None` when no source carries this id; rendered as a bare marker.
    pub source: Option<Source>,
}

/// A segment with its citation numbers bound to sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolvedSegment {
    PlainText { content: String },
    Citation { links: Vec<CitationLink> },
}

/// Bind every citation number in `segments` to its source.
pub fn resolve_segments(segments: &[Segment], sources: &[Source]) -> Vec<ResolvedSegment> {
    segments
        .iter()
        .map(|seg| match seg {
            Segment::PlainText { content } => ResolvedSegment::PlainText {
                content: content.clone(),
            },
            Segment::CitationRef { numbers } => ResolvedSegment::Citation {
                links: numbers
                    .iter()
                    .map(|&number| CitationLink {
                        number,
                        source: resolve(number, sources).cloned(),
                    })
                    .collect(),
            },
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> Segment {
        Segment::plain(s)
    }

    fn cite(numbers: &[u32]) -> Segment {
        Segment::CitationRef {
            numbers: numbers.to_vec(),
        }
    }

    #[test]
    fn splits_single_and_grouped_markers() {
        assert_eq!(
            segment("See [1] and [2, 3]."),
            vec![
                plain("See "),
                cite(&[1]),
                plain(" and "),
                cite(&[2, 3]),
                plain("."),
            ]
        );
    }

    #[test]
    fn markdown_link_is_not_a_citation() {
        let text = "Link [text](http://x.com) ok";
        assert_eq!(segment(text), vec![plain(text)]);
    }

    #[test]
    fn numeric_link_text_is_not_a_citation() {
        let text = "Read [3](https://example.com/3) first";
        assert_eq!(segment(text), vec![plain(text)]);
    }

    #[test]
    fn no_space_list_and_adjacent_markers() {
        assert_eq!(
            segment("[1,2,3][4]"),
            vec![cite(&[1, 2, 3]), cite(&[4])]
        );
    }

    #[test]
    fn text_without_markers_is_one_segment() {
        assert_eq!(segment("plain prose"), vec![plain("plain prose")]);
    }

    #[test]
    fn empty_text_has_no_segments() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn non_numeric_brackets_stay_literal() {
        let text = "an [aside] and [1a] and [ 1] and [1,]";
        assert_eq!(segment(text), vec![plain(text)]);
    }

    #[test]
    fn overflowing_number_is_dropped() {
        assert_eq!(
            segment("x [99999999999, 2]"),
            vec![plain("x "), cite(&[2])]
        );
        let text = "y [99999999999]";
        assert_eq!(segment(text), vec![plain(text)]);
    }

    #[test]
    fn order_inside_marker_is_preserved() {
        assert_eq!(segment("[5, 1, 3]"), vec![cite(&[5, 1, 3])]);
    }

    #[test]
    fn inline_code_is_left_alone() {
        assert_eq!(
            segment_markdown("Index `arr[1]` per [2]."),
            vec![plain("Index `arr[1]` per "), cite(&[2]), plain(".")]
        );
    }

    #[test]
    fn fenced_block_is_left_alone() {
        let text = "Intro [1]\n```\nlet x = v[0];\nlet y = v[2];\n```\nOutro [3]";
        assert_eq!(
            segment_markdown(text),
            vec![
                plain("Intro "),
                cite(&[1]),
                plain("\n```\nlet x = v[0];\nlet y = v[2];\n```\nOutro "),
                cite(&[3]),
            ]
        );
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let text = "Body [1]\n```\ncode [2]";
        assert_eq!(
            segment_markdown(text),
            vec![plain("Body "), cite(&[1]), plain("\n```\ncode [2]")]
        );
    }

    #[test]
    fn unmatched_backtick_is_prose() {
        assert_eq!(
            segment_markdown("a ` b [1]"),
            vec![plain("a ` b "), cite(&[1])]
        );
    }

    #[test]
    fn tilde_fence_is_left_alone() {
        let text = "Intro\n~~~\nv[1]\n~~~\n";
        assert_eq!(segment_markdown(text), vec![plain(text)]);
    }

    #[test]
    fn indented_code_block_is_left_alone() {
        let text = "Intro:\n\n    let x = v[1];\n";
        assert_eq!(segment_markdown(text), vec![plain(text)]);
    }

    #[test]
    fn long_fence_is_not_closed_by_shorter_one() {
        let text = "````\n```\nv[2]\n````\n";
        assert_eq!(segment_markdown(text), vec![plain(text)]);
    }

    #[test]
    fn markup_around_markers_is_kept_verbatim() {
        let text = "## Update\n\n**Turnout** rose [1], see [the vote](https://a.ch) and [2](https://b.ch).";
        let segments = segment_markdown(text);
        assert_eq!(
            segments,
            vec![
                plain("## Update\n\n**Turnout** rose "),
                cite(&[1]),
                plain(", see [the vote](https://a.ch) and [2](https://b.ch)."),
            ]
        );
    }

    #[test]
    fn resolves_by_exact_id() {
        let sources = vec![
            Source {
                id: 2,
                url: "http://b.com".into(),
                title: "B".into(),
            },
            Source {
                id: 1,
                url: "http://a.com".into(),
                title: "A".into(),
            },
        ];
        assert_eq!(resolve(1, &sources).map(|s| s.title.as_str()), Some("A"));
        assert!(resolve(7, &sources).is_none());

        let resolved = resolve_segments(&segment("x [2, 7]"), &sources);
        match &resolved[1] {
            ResolvedSegment::Citation { links } => {
                assert_eq!(links[0].source.as_ref().map(|s| s.id), Some(2));
                assert_eq!(links[1].number, 7);
                assert!(links[1].source.is_none());
            }
            other => panic!("expected citation, got {other:?}"),
        }
    }

    #[test]
    fn segments_serialize_tagged() {
        let json = serde_json::to_value(cite(&[1, 2])).unwrap();
        assert_eq!(json["type"], "citation_ref");
        assert_eq!(json["numbers"][1], 2);
    }
}
