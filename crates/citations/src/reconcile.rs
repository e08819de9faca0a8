//! Source-list reconciliation.
//!
//! A message's sources arrive either out of band (a `CONTEXT` frame) or as
//! a trailing section inside the answer text:
//!
//! ```text
//! Body text
//! ## Sources
//! 1. [Title A](https://a.example)
//! 2. [Title B](https://b.example)
//! ```
//!
//! Explicit sources win; the section is stripped from the display text
//! either way.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use nd_domain::stream::Source;

/// Lines that open a trailing sources section.  Matched against the whole
/// line with trailing whitespace removed, case-sensitive.
const SECTION_HEADINGS: [&str; 2] = ["## Sources", "Sources:"];

fn entry_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:(\d+)\.\s*)?\[([^\]]*)\]\((https?://[^)\s]+)\)")
            .expect("valid source entry pattern")
    })
}

/// The settled display text and numbered source list for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub display_text: String,
    pub sources: Vec<Source>,
}

/// Settle the display text and source list for a finished message.
pub fn reconcile(full_text: &str, explicit_sources: &[Source]) -> Reconciled {
    let section = split_sources_section(full_text);

    if !explicit_sources.is_empty() {
        let display_text = match section {
            Some((body, _)) => body.to_owned(),
            None => full_text.to_owned(),
        };
        return Reconciled {
            display_text,
            sources: explicit_sources.to_vec(),
        };
    }

    match section {
        Some((body, listing)) => {
            let sources = parse_source_lines(listing);
            tracing::debug!(sources = sources.len(), "extracted sources from message text");
            Reconciled {
                display_text: body.to_owned(),
                sources,
            }
        }
        None => Reconciled {
            display_text: full_text.to_owned(),
            sources: Vec::new(),
        },
    }
}

/// Split `text` at the first sources heading line.
///
/// Returns the body before the heading (trailing whitespace trimmed) and
/// everything after the heading line.
pub fn split_sources_section(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let bare = line.trim_end();
        if SECTION_HEADINGS.contains(&bare) {
            let body = text[..offset].trim_end();
            let listing = &text[offset + line.len()..];
            return Some((body, listing));
        }
        offset += line.len();
    }
    None
}

/// Parse the entries of a sources section.
///
/// Each line may carry an `N.` prefix followed by `[Title](http(s)://url)`;
/// other lines are skipped.  Numbered entries keep their number (the first
/// occurrence wins on duplicates).  Unnumbered entries take the lowest
/// free id counting from 1, in the order they appear.
pub fn parse_source_lines(listing: &str) -> Vec<Source> {
    struct Entry<'a> {
        number: Option<u32>,
        title: &'a str,
        url: &'a str,
    }

    let entries: Vec<Entry<'_>> = listing
        .lines()
        .filter_map(|line| {
            let caps = entry_pattern().captures(line)?;
            Some(Entry {
                number: caps
                    .get(1)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .filter(|&n| n > 0),
                title: caps.get(2).map_or("", |m| m.as_str()),
                url: caps.get(3).map_or("", |m| m.as_str()),
            })
        })
        .collect();

    let mut taken: HashSet<u32> = HashSet::new();
    let mut keep = vec![false; entries.len()];
    for (i, entry) in entries.iter().enumerate() {
        if let Some(n) = entry.number {
            keep[i] = taken.insert(n);
            if !keep[i] {
                tracing::debug!(id = n, "duplicate source number, keeping the first");
            }
        }
    }

    let mut next_id = 1u32;
    let mut sources = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let id = match entry.number {
            Some(n) if keep[i] => n,
            Some(_) => continue,
            None => {
                while taken.contains(&next_id) {
                    next_id += 1;
                }
                taken.insert(next_id);
                next_id
            }
        };
        sources.push(Source {
            id,
            url: entry.url.to_owned(),
            title: entry.title.to_owned(),
        });
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(id: u32, title: &str, url: &str) -> Source {
        Source {
            id,
            url: url.into(),
            title: title.into(),
        }
    }

    #[test]
    fn extracts_numbered_section() {
        let out = reconcile(
            "Body text\n## Sources\n1. [A](http://a.com)\n2. [B](http://b.com)",
            &[],
        );
        assert_eq!(out.display_text, "Body text");
        assert_eq!(
            out.sources,
            vec![src(1, "A", "http://a.com"), src(2, "B", "http://b.com")]
        );
    }

    #[test]
    fn reconciling_display_text_again_is_a_no_op() {
        let first = reconcile(
            "Body text\n## Sources\n1. [A](http://a.com)\n2. [B](http://b.com)",
            &[],
        );
        let second = reconcile(&first.display_text, &[]);
        assert_eq!(second.display_text, first.display_text);
        assert!(second.sources.is_empty());
    }

    #[test]
    fn plain_sources_colon_heading() {
        let out = reconcile("Answer.\n\nSources:\n[A](https://a.com)\n", &[]);
        assert_eq!(out.display_text, "Answer.");
        assert_eq!(out.sources, vec![src(1, "A", "https://a.com")]);
    }

    #[test]
    fn explicit_sources_are_authoritative() {
        let explicit = vec![src(1, "Wire", "https://wire.example")];
        let out = reconcile("Body\n## Sources\n1. [Other](http://o.com)", &explicit);
        assert_eq!(out.display_text, "Body");
        assert_eq!(out.sources, explicit);
    }

    #[test]
    fn explicit_sources_without_section_keep_text() {
        let explicit = vec![src(1, "Wire", "https://wire.example")];
        let out = reconcile("Body [1]", &explicit);
        assert_eq!(out.display_text, "Body [1]");
        assert_eq!(out.sources, explicit);
    }

    #[test]
    fn no_section_means_no_sources() {
        let out = reconcile("Just an answer [1].", &[]);
        assert_eq!(out.display_text, "Just an answer [1].");
        assert!(out.sources.is_empty());
    }

    #[test]
    fn heading_must_fill_the_line() {
        let text = "We list ## Sources inline\nsources:\n### Sources\n1. [A](http://a.com)";
        assert!(split_sources_section(text).is_none());
    }

    #[test]
    fn heading_with_crlf_matches() {
        let (body, listing) = split_sources_section("Body\r\n## Sources\r\n1. [A](http://a.com)\r\n").unwrap();
        assert_eq!(body, "Body");
        assert_eq!(parse_source_lines(listing), vec![src(1, "A", "http://a.com")]);
    }

    #[test]
    fn unnumbered_entries_get_sequential_ids() {
        let listing = "[A](http://a.com)\nnot a source\n[B](https://b.com)\n- bullet";
        assert_eq!(
            parse_source_lines(listing),
            vec![src(1, "A", "http://a.com"), src(2, "B", "https://b.com")]
        );
    }

    #[test]
    fn unnumbered_entries_skip_taken_ids() {
        let listing = "[A](http://a.com)\n1. [B](http://b.com)\n[C](http://c.com)";
        assert_eq!(
            parse_source_lines(listing),
            vec![
                src(2, "A", "http://a.com"),
                src(1, "B", "http://b.com"),
                src(3, "C", "http://c.com"),
            ]
        );
    }

    #[test]
    fn duplicate_numbers_keep_first() {
        let listing = "1. [A](http://a.com)\n1. [B](http://b.com)";
        assert_eq!(parse_source_lines(listing), vec![src(1, "A", "http://a.com")]);
    }

    #[test]
    fn non_http_links_are_skipped() {
        let listing = "1. [Mail](mailto:x@y.z)\n2. [Ok](https://ok.example/path?q=1)";
        assert_eq!(
            parse_source_lines(listing),
            vec![src(2, "Ok", "https://ok.example/path?q=1")]
        );
    }

    #[test]
    fn output_is_deterministic() {
        let text = "B\n## Sources\n[X](http://x.com)\n3. [Y](http://y.com)\n[Z](http://z.com)";
        assert_eq!(reconcile(text, &[]), reconcile(text, &[]));
    }
}
