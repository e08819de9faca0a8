//! Stream adapters around [`FrameDecoder`].
//!
//! [`decode_byte_stream`] is transport-agnostic; [`frame_stream`] plugs a
//! `reqwest::Response` body into it.

use futures_util::StreamExt;

use nd_domain::error::{Error, Result};
use nd_domain::stream::{BoxStream, StreamEvent};

use crate::decoder::FrameDecoder;

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Decode a stream of byte chunks into stream events.
///
/// The returned stream:
/// 1. Feeds every chunk to a fresh [`FrameDecoder`] and yields its events
/// 2. Flushes the trailing partial line when the source ends
/// 3. Yields a single `Err` and stops if the source yields an error
pub fn decode_byte_stream<S, B>(chunks: S) -> BoxStream<'static, Result<StreamEvent>>
where
    S: futures_core::Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut decoder = FrameDecoder::new();

        loop {
            match chunks.next().await {
                Some(Ok(bytes)) => {
                    for event in decoder.decode(bytes.as_ref()) {
                        yield Ok(event);
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        error = %e,
                        pending_bytes = decoder.pending_bytes(),
                        "response stream read failed"
                    );
                    yield Err(e);
                    break;
                }
                None => {
                    for event in decoder.finish() {
                        yield Ok(event);
                    }
                    tracing::debug!(
                        frames = decoder.frames(),
                        malformed = decoder.malformed_frames(),
                        "response stream closed"
                    );
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

/// Build an event stream from a streamed query response body.
pub fn frame_stream(response: reqwest::Response) -> BoxStream<'static, Result<StreamEvent>> {
    decode_byte_stream(response.bytes_stream().map(|chunk| chunk.map_err(from_reqwest)))
}
