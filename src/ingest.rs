//! Incremental decoding of streamed chat answers.
//!
//! The `/chat` endpoint answers with a plain chunked body.  Chunk boundaries
//! fall wherever the transport put them, including inside a multi-byte
//! character, so the decoder holds back at most one incomplete code point and
//! forwards everything else as soon as it arrives.

use std::pin::Pin;
use std::str::Utf8Error;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::client::ChatBody;
use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_INCREMENTS};
use crate::{Error, Result};

/// A boxed stream of decoded text increments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Reassembles UTF-8 text from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bytes held back waiting for the rest of a
    /// character.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Decodes as much of `chunk` (plus anything pending) as possible.
    ///
    /// A trailing incomplete character is kept for the next call.  On bytes
    /// that can never be valid UTF-8, the error carries the text that decoded
    /// cleanly before them; the decoder is left empty.
    pub fn push(&mut self, chunk: &[u8]) -> std::result::Result<String, (String, Utf8Error)> {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(err) => {
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                if err.error_len().is_some() {
                    self.pending.clear();
                    Err((text, err))
                } else {
                    self.pending.drain(..valid);
                    Ok(text)
                }
            }
        }
    }

    /// Flushes whatever is pending at end of body.  An incomplete trailing
    /// character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

struct DecodeState<S> {
    stream: S,
    decoder: Utf8Decoder,
    failed: Option<Error>,
    done: bool,
}

/// Turns a byte stream into a stream of non-empty text increments.
///
/// The returned stream ends when the body does, or right after yielding the
/// first error.
pub fn decode_stream<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = DecodeState {
        stream: byte_stream,
        decoder: Utf8Decoder::new(),
        failed: None,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(err) = state.failed.take() {
                STREAM_ERRORS.click();
                state.done = true;
                return Some((Err(err), state));
            }
            if state.done {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    let text = match state.decoder.push(&bytes) {
                        Ok(text) => text,
                        Err((text, err)) => {
                            state.failed = Some(Error::from(err));
                            text
                        }
                    };
                    if !text.is_empty() {
                        STREAM_INCREMENTS.click();
                        return Some((Ok(text), state));
                    }
                }
                Some(Err(err)) => {
                    state.failed = Some(err);
                }
                None => {
                    state.done = true;
                    let text = state.decoder.finish();
                    if !text.is_empty() {
                        STREAM_INCREMENTS.click();
                        return Some((Ok(text), state));
                    }
                    return None;
                }
            }
        }
    })
}

/// Converts a chat response body into text increments.
///
/// A JSON answer arrives all at once and becomes a single increment.
pub fn text_stream(body: ChatBody) -> TextStream {
    match body {
        ChatBody::Stream(bytes) => Box::pin(decode_stream(bytes)),
        ChatBody::Answer(answer) if answer.is_empty() => Box::pin(stream::empty()),
        ChatBody::Answer(answer) => Box::pin(stream::once(async move { Ok(answer) })),
    }
}
