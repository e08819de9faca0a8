//! `nd-citations`: turning a finished assistant answer into display parts.
//!
//! - [`reconcile`] settles the numbered source list for a message, from the
//!   explicit `CONTEXT` sources or a trailing "Sources" section in the text.
//! - [`segment`] / [`segment_markdown`] split prose into plain text and
//!   citation markers such as `[1]` or `[2, 5]`.
//! - [`resolve_segments`] binds each marker number to its source.
//!
//! Everything here assumes the text is final.  Running it on a partially
//! streamed body would misread a truncated `[1` or `## Sou` line.

pub mod clean;
pub mod reconcile;
pub mod segment;

pub use clean::clean_message;
pub use reconcile::{parse_source_lines, reconcile, split_sources_section, Reconciled};
pub use segment::{
    resolve, resolve_segments, segment, segment_markdown, CitationLink, ResolvedSegment, Segment,
};
