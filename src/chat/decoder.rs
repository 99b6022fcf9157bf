//! Incremental UTF-8 decoding for chunked reply bodies.
//!
//! The chat backend streams raw text; HTTP chunk boundaries can land inside
//! a multi-byte codepoint, so each chunk is appended to a byte buffer and
//! only the valid prefix is released. `String::from_utf8_lossy` would
//! instead inject U+FFFD at every split codepoint.

use crate::errors::AppError;

/// Stateful decoder that buffers an incomplete trailing UTF-8 sequence
/// across chunk boundaries.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feeds one chunk of bytes and returns the decoded text available so
    /// far. The returned string may be empty when the chunk ends inside a
    /// codepoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ChatTransport`] when the bytes are not valid
    /// UTF-8 (as opposed to merely incomplete).
    pub fn feed(&mut self, bytes: &[u8]) -> Result<String, AppError> {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(valid) => {
                let text = valid.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(AppError::ChatTransport(
                        "Invalid UTF-8 in streaming reply".to_string(),
                    ));
                }

                let valid_up_to = e.valid_up_to();
                let text = std::str::from_utf8(&self.pending[..valid_up_to])
                    .map_err(|e| {
                        AppError::ChatTransport(format!(
                            "Invalid UTF-8 in streaming reply prefix: {e}"
                        ))
                    })?
                    .to_string();
                self.pending.drain(..valid_up_to);
                Ok(text)
            }
        }
    }

    /// Checks that no partial codepoint is left once the transport signals
    /// completion.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ChatTransport`] when the stream ended mid
    /// codepoint.
    pub fn finish(&self) -> Result<(), AppError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(AppError::ChatTransport(
                "Streaming reply ended inside a UTF-8 sequence".to_string(),
            ))
        }
    }

    /// Bytes still waiting for the rest of their codepoint.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii_passes_through() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.feed(b"Hello, world").unwrap(), "Hello, world");
        assert_eq!(decoder.pending_len(), 0);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_codepoint_split_across_chunks() {
        let text = "coût réel";
        let bytes = text.as_bytes();
        // Split inside the two-byte sequence for 'û'.
        let split = bytes.iter().position(|b| *b >= 0xC0).unwrap() + 1;

        let mut decoder = ChunkDecoder::new();
        let first = decoder.feed(&bytes[..split]).unwrap();
        assert!(decoder.pending_len() > 0);
        let second = decoder.feed(&bytes[split..]).unwrap();
        assert_eq!(format!("{first}{second}"), text);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_byte_at_a_time_reassembles() {
        let text = "Hola 世界 🌍";
        let mut decoder = ChunkDecoder::new();
        let mut collected = String::new();
        for byte in text.as_bytes() {
            collected.push_str(&decoder.feed(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(collected, text);
        decoder.finish().unwrap();
    }

    #[test]
    fn test_invalid_byte_is_an_error() {
        let mut decoder = ChunkDecoder::new();
        let err = decoder.feed(&[0xFF]).unwrap_err();
        assert!(matches!(err, AppError::ChatTransport(_)));
    }

    #[test]
    fn test_truncated_tail_fails_finish() {
        let mut decoder = ChunkDecoder::new();
        // First byte of a three-byte sequence, never completed.
        decoder.feed(&[0xE4]).unwrap();
        assert!(decoder.finish().is_err());
    }

    #[test]
    fn test_empty_chunk_is_harmless() {
        let mut decoder = ChunkDecoder::new();
        assert_eq!(decoder.feed(b"").unwrap(), "");
        decoder.finish().unwrap();
    }
}
