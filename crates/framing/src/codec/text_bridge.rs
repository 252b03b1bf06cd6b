//! Byte to text bridge.
//!
//! Network reads deliver arbitrary byte spans, so a multi-byte UTF-8 sequence
//! may be split across two reads. [`TextBridge`] holds back an incomplete
//! trailing sequence until the rest arrives and reports, for each decoded span,
//! how many more bytes than characters it carries (its *overhead*).
//!
//! Invalid sequences decode to U+FFFD, which takes three bytes of text no
//! matter how many wire bytes it replaced. Every such substitution is reported
//! as a [`Replacement`] so that wire byte counts can still be mapped onto the
//! decoded text.

use bytes::{Buf, BytesMut};

/// Length of U+FFFD in decoded text
pub(crate) const REPLACEMENT_LEN: usize = char::REPLACEMENT_CHARACTER.len_utf8();

/// A U+FFFD in decoded text that stands for `wire_len` raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Replacement {
    /// byte offset of the U+FFFD in the text
    pub(crate) at: usize,
    pub(crate) wire_len: usize,
}

/// Text decoded from one byte span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DecodedText {
    pub(crate) text: String,
    /// byte length minus character count of `text`
    pub(crate) overhead: usize,
    /// substituted invalid sequences, in text order
    pub(crate) replacements: Vec<Replacement>,
}

impl DecodedText {
    pub(crate) fn new(text: String, replacements: Vec<Replacement>) -> Self {
        let overhead = text.len() - text.chars().count();
        Self { text, overhead, replacements }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct TextBridge {
    /// head of a multi-byte sequence still waiting for its tail
    pending: BytesMut,
}

impl TextBridge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes` after any held back prefix.
    ///
    /// Invalid sequences are replaced with U+FFFD; an incomplete sequence at
    /// the very end is kept for the next call.
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> DecodedText {
        self.pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.pending.len());
        let mut replacements = Vec::new();
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
                        // truncated sequence, wait for more bytes
                        None => {
                            self.pending.advance(valid_up_to);
                            break;
                        }
                        Some(invalid_len) => {
                            replacements.push(Replacement { at: text.len(), wire_len: invalid_len });
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.advance(valid_up_to + invalid_len);
                        }
                    }
                }
            }
        }

        DecodedText::new(text, replacements)
    }

    /// Gives up on the held back sequence and decodes it as one U+FFFD.
    ///
    /// Used when framing says the span ends right after those bytes, so the
    /// rest of the character can never arrive.
    pub(crate) fn flush(&mut self) -> DecodedText {
        if self.pending.is_empty() {
            return DecodedText::default();
        }

        let replacement = Replacement { at: 0, wire_len: self.pending.len() };
        self.pending.clear();
        DecodedText::new(char::REPLACEMENT_CHARACTER.to_string(), vec![replacement])
    }

    /// Number of bytes held back waiting for the rest of a character
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
