//! `nd-stream`: incremental decoding of streamed chat responses.
//!
//! The backend answers a query with a chunked body of newline-delimited
//! frames, each either raw JSON or `data: <JSON>`.  [`FrameDecoder`] turns
//! arbitrary byte chunks into typed [`StreamEvent`]s, and
//! [`frame_stream`] wires it to a `reqwest::Response`.
//!
//! [`StreamEvent`]: nd_domain::stream::StreamEvent

pub mod decoder;
pub mod response;

pub use decoder::{parse_frame, FrameDecoder};
pub use response::{decode_byte_stream, frame_stream, from_reqwest};
