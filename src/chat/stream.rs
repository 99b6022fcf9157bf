//! One streaming reply body, pulled chunk by chunk.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::warn;

use crate::chat::decoder::ChunkDecoder;
use crate::errors::AppError;

type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

/// A chat reply arriving incrementally. Concatenating every chunk yields the
/// full reply text.
pub struct ReplyStream {
    bytes: ByteStream,
    decoder: ChunkDecoder,
    done: bool,
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyStream")
            .field("done", &self.done)
            .field("pending_bytes", &self.decoder.pending_len())
            .finish_non_exhaustive()
    }
}

impl ReplyStream {
    #[must_use]
    pub fn new(
        bytes: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            bytes: Box::pin(bytes),
            decoder: ChunkDecoder::new(),
            done: false,
        }
    }

    /// Returns the next non-empty decoded text chunk, or `None` once the
    /// transport is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ChatTransport`] on a transport read failure or
    /// invalid UTF-8. The stream yields nothing further afterwards; whatever
    /// text was already returned stays with the caller.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, AppError> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self.bytes.next().await {
                Some(Ok(bytes)) => {
                    let text = self.decoder.feed(&bytes).inspect_err(|_| {
                        self.done = true;
                    })?;
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                    // Chunk ended inside a codepoint; keep reading.
                }
                Some(Err(e)) => {
                    self.done = true;
                    warn!("Streaming reply transport error: {e}");
                    return Err(AppError::ChatTransport(format!(
                        "Error reading streaming reply: {e}"
                    )));
                }
                None => {
                    self.done = true;
                    self.decoder.finish()?;
                    return Ok(None);
                }
            }
        }
    }

    /// Drains the remaining chunks into one string.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ChatTransport`] when the transport fails
    /// mid-stream.
    pub async fn collect_text(&mut self) -> Result<String, AppError> {
        let mut collected = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            collected.push_str(&chunk);
        }
        Ok(collected)
    }
}
