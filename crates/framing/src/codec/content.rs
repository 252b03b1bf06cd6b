//! Decoded-text workspace shared by every step of the parser.
//!
//! [`ContentAccumulator`] owns the active buffer, the read cursor into it and a
//! FIFO backlog of fragments that arrived while the buffer was already large.
//! Reads either succeed or return `Poll::Pending` when the buffered content is
//! insufficient; they never block and never consume a partial line.
//!
//! Positions are byte offsets into UTF-8 text. For valid input they line up
//! with the wire byte counts used by `Content-Length` and chunk sizes; each
//! U+FFFD substituted for an invalid sequence is tracked with the number of
//! wire bytes it replaced, so [`need_bytes`](ContentAccumulator::need_bytes)
//! always counts in wire bytes. The overhead counter tracks how many more
//! bytes than characters the unconsumed text holds.

use std::collections::VecDeque;
use std::task::Poll;

use tracing::trace;

use crate::codec::text_bridge::{DecodedText, REPLACEMENT_LEN, Replacement, TextBridge};
use crate::config::ParserConfig;
use crate::protocol::ParseError;

#[derive(Debug)]
pub(crate) struct ContentAccumulator {
    bridge: TextBridge,
    buffer: String,
    /// everything before `cursor` is consumed
    cursor: usize,
    /// `buffer[cursor..scanned]` is known to hold no line feed
    scanned: usize,
    /// byte length minus character count of `buffer[cursor..]`
    overhead: usize,
    /// substitutions at or after `cursor`, offsets into `buffer`
    replacements: VecDeque<Replacement>,
    /// fragments: decoded text not yet merged into `buffer`
    backlog: VecDeque<DecodedText>,
    merge_threshold: usize,
    max_line_bytes: usize,
}

impl ContentAccumulator {
    pub(crate) fn new(config: &ParserConfig) -> Self {
        Self {
            bridge: TextBridge::new(),
            buffer: String::new(),
            cursor: 0,
            scanned: 0,
            overhead: 0,
            replacements: VecDeque::new(),
            backlog: VecDeque::new(),
            merge_threshold: config.merge_threshold(),
            max_line_bytes: config.max_line_bytes(),
        }
    }

    /// Decodes `bytes` and appends them to the active buffer, or queues them
    /// behind the backlog to keep arrival order.
    pub(crate) fn feed(&mut self, bytes: &[u8]) {
        let decoded = self.bridge.decode(bytes);
        if decoded.is_empty() {
            return;
        }

        if self.backlog.is_empty() && self.remaining_len() < self.merge_threshold {
            self.append(decoded);
        } else {
            trace!(len = decoded.text.len(), "queue fragment behind active buffer");
            self.backlog.push_back(decoded);
        }
    }

    /// Reads the next line, without its terminator and trimmed.
    ///
    /// Lines end at LF with an optional preceding CR. Blank lines are skipped
    /// unless `allow_blank` is set.
    pub(crate) fn need_line(&mut self, allow_blank: bool) -> Poll<Result<String, ParseError>> {
        loop {
            match self.buffer[self.scanned..].find('\n') {
                Some(offset) => {
                    let line_break = self.scanned + offset;
                    let raw = &self.buffer[self.cursor..line_break];
                    let line = raw.strip_suffix('\r').unwrap_or(raw).trim().to_owned();
                    self.consume_to(line_break + 1);

                    if line.is_empty() && !allow_blank {
                        continue;
                    }
                    return Poll::Ready(Ok(line));
                }
                None => {
                    self.scanned = self.buffer.len();

                    let line_len = self.remaining_len();
                    if line_len > self.max_line_bytes {
                        return Poll::Ready(Err(ParseError::too_large_header(line_len, self.max_line_bytes)));
                    }

                    if !self.merge_next() {
                        self.compact();
                        return Poll::Pending;
                    }
                }
            }
        }
    }

    /// Reads up to `wanted` wire bytes of text.
    ///
    /// Returns as much of the span as is buffered, never less than one byte,
    /// together with the number of wire bytes it covers, so the caller only
    /// asks for the undelivered rest on its next call. Pending when nothing is
    /// buffered at all.
    pub(crate) fn need_bytes(&mut self, wanted: usize) -> Poll<Result<(String, usize), ParseError>> {
        if wanted == 0 {
            return Poll::Ready(Ok((String::new(), 0)));
        }

        while self.remaining_wire_len() < wanted && self.merge_next() {}

        // the span ends right after bytes the bridge is still holding back
        let pending = self.bridge.pending_len();
        if pending > 0 && self.backlog.is_empty() && self.remaining_wire_len() + pending == wanted {
            trace!(pending, "span ends inside an incomplete character");
            let flushed = self.bridge.flush();
            self.append(flushed);
        }

        let available = self.remaining_wire_len();
        if available == 0 {
            self.compact();
            return Poll::Pending;
        }

        let (end, wire_len) = self.wire_span_end(available.min(wanted));
        if end == self.cursor {
            return Poll::Ready(Err(ParseError::invalid_body("body length ends inside an invalid byte sequence")));
        }
        if !self.buffer.is_char_boundary(end) {
            return Poll::Ready(Err(ParseError::invalid_body("body length ends inside a multi-byte character")));
        }

        let span = self.buffer[self.cursor..end].to_owned();
        self.consume_to(end);
        Poll::Ready(Ok((span, wire_len)))
    }

    /// Takes everything buffered, backlog included.
    pub(crate) fn take_all(&mut self) -> String {
        while self.merge_next() {}

        let span = self.buffer[self.cursor..].to_owned();
        self.consume_to(self.buffer.len());
        self.compact();
        span
    }

    /// Drops consumed text and rebases the cursor to the buffer start.
    ///
    /// Returns the unconsumed suffix that now makes up the whole buffer.
    pub(crate) fn compact(&mut self) -> &str {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.scanned -= self.cursor;
            for replacement in &mut self.replacements {
                replacement.at -= self.cursor;
            }
            self.cursor = 0;
        }
        &self.buffer
    }

    /// True when all decoded content is consumed and no fragment is queued
    pub(crate) fn is_idle(&self) -> bool {
        self.cursor >= self.buffer.len() && self.backlog.is_empty()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn overhead(&self) -> usize {
        self.overhead
    }

    /// Unconsumed text of the active buffer
    #[cfg(test)]
    pub(crate) fn remaining(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    #[cfg(test)]
    pub(crate) fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    fn remaining_len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Wire bytes behind the unconsumed text of the active buffer
    fn remaining_wire_len(&self) -> usize {
        let shrunk: usize = self.replacements.iter().map(|replacement| REPLACEMENT_LEN - replacement.wire_len).sum();
        self.remaining_len() - shrunk
    }

    /// Buffer offset after at most `wanted` wire bytes from the cursor, and
    /// the wire bytes actually covered. Stops short of a replacement that
    /// would overshoot. `wanted` must not exceed the remaining wire length.
    fn wire_span_end(&self, wanted: usize) -> (usize, usize) {
        let mut end = self.cursor;
        let mut wire_len = 0;

        for replacement in &self.replacements {
            let plain = replacement.at - end;
            if wire_len + plain >= wanted {
                return (end + wanted - wire_len, wanted);
            }
            wire_len += plain;

            if wire_len + replacement.wire_len > wanted {
                return (replacement.at, wire_len);
            }
            wire_len += replacement.wire_len;
            end = replacement.at + REPLACEMENT_LEN;
        }

        (end + wanted - wire_len, wanted)
    }

    fn append(&mut self, decoded: DecodedText) {
        let base = self.buffer.len();
        self.replacements.extend(
            decoded.replacements.iter().map(|replacement| Replacement { at: base + replacement.at, ..*replacement }),
        );
        self.overhead += decoded.overhead;
        self.buffer.push_str(&decoded.text);
    }

    fn consume_to(&mut self, end: usize) {
        let consumed = &self.buffer[self.cursor..end];
        self.overhead -= consumed.len() - consumed.chars().count();
        self.cursor = end;
        self.scanned = self.scanned.max(end);

        while self.replacements.front().is_some_and(|replacement| replacement.at < end) {
            self.replacements.pop_front();
        }
    }

    /// Merges exactly one queued fragment; false if the backlog is empty.
    fn merge_next(&mut self) -> bool {
        let Some(fragment) = self.backlog.pop_front() else {
            return false;
        };

        self.compact();
        let len = fragment.text.len();
        self.append(fragment);
        trace!(len, backlog = self.backlog.len(), "merged queued fragment");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator() -> ContentAccumulator {
        ContentAccumulator::new(&ParserConfig::default())
    }

    fn ready<T>(poll: Poll<Result<T, ParseError>>) -> T {
        match poll {
            Poll::Ready(Ok(value)) => value,
            Poll::Ready(Err(e)) => panic!("unexpected error: {e}"),
            Poll::Pending => panic!("unexpected pending"),
        }
    }

    #[test]
    fn reads_crlf_and_lf_lines() {
        let mut content = accumulator();
        content.feed(b"first\r\nsecond\n\r\nrest");

        assert_eq!(ready(content.need_line(true)), "first");
        assert_eq!(ready(content.need_line(true)), "second");
        assert_eq!(ready(content.need_line(true)), "");
        assert!(content.need_line(true).is_pending());
        assert_eq!(content.remaining(), "rest");
        assert_eq!(content.cursor(), 0);
    }

    #[test]
    fn skips_blank_lines_when_not_allowed() {
        let mut content = accumulator();
        content.feed(b"\r\n\nHTTP/1.1 200 OK\r\n");
        assert_eq!(ready(content.need_line(false)), "HTTP/1.1 200 OK");
        assert!(content.is_idle());
    }

    #[test]
    fn line_split_across_feeds() {
        let mut content = accumulator();
        content.feed(b"HTTP/1.1 2");
        assert!(content.need_line(false).is_pending());

        content.feed(b"00 OK\r");
        assert!(content.need_line(false).is_pending());

        content.feed(b"\n");
        assert_eq!(ready(content.need_line(false)), "HTTP/1.1 200 OK");
    }

    #[test]
    fn need_bytes_delivers_partial_spans() {
        let mut content = accumulator();
        content.feed(b"ab\n");

        assert_eq!(ready(content.need_bytes(5)), ("ab\n".to_owned(), 3));
        assert!(content.need_bytes(2).is_pending());

        content.feed(b"cdNEXT");
        assert_eq!(ready(content.need_bytes(2)), ("cd".to_owned(), 2));
        assert_eq!(content.remaining(), "NEXT");
    }

    #[test]
    fn need_bytes_rejects_split_character() {
        let mut content = accumulator();
        content.feed("é".as_bytes());
        assert!(matches!(content.need_bytes(1), Poll::Ready(Err(ParseError::InvalidBody { .. }))));
    }

    #[test]
    fn overhead_follows_unconsumed_text() {
        let mut content = accumulator();
        content.feed("é\n€".as_bytes());
        assert_eq!(content.overhead(), 3);

        assert_eq!(ready(content.need_line(true)), "é");
        assert_eq!(content.overhead(), 2);

        assert_eq!(ready(content.need_bytes(3)), ("€".to_owned(), 3));
        assert_eq!(content.overhead(), 0);
    }

    #[test]
    fn need_bytes_counts_wire_bytes_of_invalid_sequences() {
        let mut content = accumulator();
        content.feed(&[b'a', 0xff, b'b', b'H']);

        assert_eq!(ready(content.need_bytes(3)), ("a\u{fffd}b".to_owned(), 3));
        assert_eq!(content.remaining(), "H");
    }

    #[test]
    fn need_bytes_stops_before_an_overshooting_replacement() {
        let mut content = accumulator();
        // truncated '€' stands for two wire bytes
        content.feed(&[b'a', 0xe2, 0x82, b'H']);

        assert_eq!(ready(content.need_bytes(2)), ("a".to_owned(), 1));
        assert!(matches!(content.need_bytes(1), Poll::Ready(Err(ParseError::InvalidBody { .. }))));
    }

    #[test]
    fn replacements_survive_compaction_and_backlog() {
        let config = ParserConfig::default().with_merge_threshold(4);
        let mut content = ContentAccumulator::new(&config);
        content.feed(b"line\n");
        content.feed(&[0xff, 0xfe, b'x', b'y']);
        assert_eq!(content.backlog_len(), 1);

        assert_eq!(ready(content.need_line(true)), "line");
        assert_eq!(ready(content.need_bytes(3)), ("\u{fffd}\u{fffd}x".to_owned(), 3));
        assert_eq!(content.remaining(), "y");
    }

    #[test]
    fn span_ending_in_held_back_bytes_is_flushed() {
        let mut content = accumulator();
        content.feed(&[b'o', b'k', 0xe2, 0x82]);

        assert_eq!(ready(content.need_bytes(4)), ("ok\u{fffd}".to_owned(), 4));
        assert!(content.is_idle());

        // a later continuation byte is no longer glued to the flushed sequence
        content.feed(&[0xac]);
        assert_eq!(ready(content.need_bytes(1)), ("\u{fffd}".to_owned(), 1));
    }

    #[test]
    fn held_back_bytes_wait_while_the_span_continues() {
        let euro = "€".as_bytes();
        let mut content = accumulator();
        content.feed(&euro[..2]);
        assert!(content.need_bytes(3).is_pending());

        content.feed(&euro[2..]);
        assert_eq!(ready(content.need_bytes(3)), ("€".to_owned(), 3));
    }

    #[test]
    fn backlog_keeps_arrival_order() {
        let config = ParserConfig::default().with_merge_threshold(4);
        let mut content = ContentAccumulator::new(&config);

        content.feed(b"line");
        content.feed(b" one\n");
        content.feed(b"line two\n");
        assert_eq!(content.backlog_len(), 2);

        assert_eq!(ready(content.need_line(true)), "line one");
        assert_eq!(content.backlog_len(), 1);
        assert_eq!(ready(content.need_line(true)), "line two");
        assert!(content.is_idle());
    }

    #[test]
    fn take_all_drains_backlog() {
        let config = ParserConfig::default().with_merge_threshold(1);
        let mut content = ContentAccumulator::new(&config);
        content.feed(b"data: a\n");
        content.feed(b"data: b\n");

        assert_eq!(content.take_all(), "data: a\ndata: b\n");
        assert!(content.is_idle());
        assert_eq!(content.cursor(), 0);
    }

    #[test]
    fn oversized_line_is_fatal() {
        let config = ParserConfig::default().with_max_line_bytes(8);
        let mut content = ContentAccumulator::new(&config);
        content.feed(b"0123456789");

        assert!(matches!(content.need_line(false), Poll::Ready(Err(ParseError::TooLargeHeader { .. }))));
    }

    #[test]
    fn compact_rebases_cursor() {
        let mut content = accumulator();
        content.feed(b"abc\ndef");
        assert_eq!(ready(content.need_line(true)), "abc");
        assert_eq!(content.cursor(), 4);

        assert_eq!(content.compact(), "def");
        assert_eq!(content.cursor(), 0);
        assert!(!content.is_idle());
    }
}
