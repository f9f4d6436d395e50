//! Turning ids into text one at a time, as a generation loop produces them.
//!
//! A single token can end partway through a multi-byte code point, so the bytes of each id can't
//! be printed on their own.  [`StreamDecoder`] holds on to an incomplete trailing sequence until
//! a later id completes it.
use crate::{Result, TokenBytes, TokenId, Tokenizer};

/// Incremental decoder.  Create with [`Tokenizer::stream_decoder`].
///
/// The concatenation of everything returned by [`Self::push`] and [`Self::finish`] is exactly
/// what [`Tokenizer::decode`] returns for the same ids.
#[derive(Clone, Debug)]
pub struct StreamDecoder {
    tokenizer: Tokenizer,

    /// Bytes received but not yet returned.  Always a (possibly empty) prefix of one UTF-8
    /// sequence.
    pending: TokenBytes,
}

impl StreamDecoder {
    pub(crate) fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            pending: TokenBytes::new(),
        }
    }

    /// Add one id, and get back whatever text is now complete.
    ///
    /// Returns `Ok(None)` when the id only extended an incomplete code point.  Bytes that can
    /// never become valid UTF-8 are replaced with U+FFFD right away.
    pub fn push(&mut self, id: TokenId) -> Result<Option<String>> {
        let bytes = self.tokenizer.decode_one(id)?;
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

                    match e.error_len() {
                        // Could still be completed by the next id
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid_len);
                        }
                    }
                }
            }
        }

        Ok((!text.is_empty()).then_some(text))
    }

    /// Flush anything still held back.  An incomplete sequence comes out as U+FFFD.
    ///
    /// The decoder is empty afterwards and can be reused.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();

        rest
    }

    /// Number of bytes held back waiting for the rest of a code point
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
