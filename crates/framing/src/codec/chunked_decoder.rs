//! Decoder for `Transfer-Encoding: chunked` bodies.
//!
//! Follows [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1):
//! each chunk is a hexadecimal size line followed by that many bytes of data,
//! and a zero-sized chunk ends the body. The decoder can be suspended at any
//! byte and picks up exactly where it stopped, keeping the payload collected
//! so far.

use std::mem;
use std::task::{Poll, ready};

use tracing::{trace, warn};
use ChunkedState::*;

use crate::codec::content::ContentAccumulator;
use crate::config::ParserConfig;
use crate::protocol::ParseError;

#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    state: ChunkedState,
    body: String,
    /// wire bytes of all chunk data announced so far
    announced: usize,
    trailers: usize,
    lenient: bool,
    max_body_bytes: usize,
    max_trailers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size line
    Size,
    /// Read chunk data
    Data { remaining: usize },
    /// Skip trailer fields up to the final blank line
    Trailer,
    /// Last chunk and trailer consumed
    End,
}

impl ChunkedDecoder {
    pub(crate) fn new(config: &ParserConfig) -> Self {
        Self {
            state: Size,
            body: String::new(),
            announced: 0,
            trailers: 0,
            lenient: config.lenient_chunk_size(),
            max_body_bytes: config.max_body_bytes(),
            max_trailers: config.max_headers(),
        }
    }

    /// Drives the decoder as far as the buffered content allows.
    ///
    /// # Returns
    /// - `Ready(Ok(body))` with the concatenated payload after the last chunk
    /// - `Pending` when more input is needed
    /// - `Ready(Err(_))` on an oversized body, too many trailer fields, or a
    ///   malformed size line in strict mode
    pub(crate) fn decode(&mut self, content: &mut ContentAccumulator) -> Poll<Result<String, ParseError>> {
        loop {
            self.state = match self.state {
                Size => ready!(self.read_size(content))?,
                Data { remaining } => ready!(self.read_data(content, remaining))?,
                Trailer => ready!(self.read_trailer(content))?,
                End => {
                    trace!(len = self.body.len(), "finished reading chunked data");
                    content.compact();
                    return Poll::Ready(Ok(mem::take(&mut self.body)));
                }
            };
        }
    }

    fn read_size(&mut self, content: &mut ContentAccumulator) -> Poll<Result<ChunkedState, ParseError>> {
        let line = ready!(content.need_line(true))?;

        // CRLF trailing the previous chunk's data
        if line.is_empty() {
            return Poll::Ready(Ok(Size));
        }

        let size = line.split(';').next().unwrap_or_default().trim();
        let state = match usize::from_str_radix(size, 16) {
            Ok(0) => Trailer,
            Ok(chunk_size) => {
                let total = self.announced.saturating_add(chunk_size);
                if total > self.max_body_bytes {
                    return Poll::Ready(Err(ParseError::too_large_body(total, self.max_body_bytes)));
                }
                self.announced = total;
                trace!(chunk_size, "read chunk size");
                Data { remaining: chunk_size }
            }
            Err(_) if self.lenient => {
                warn!(line, "malformed chunk size line, treating it as the last chunk");
                End
            }
            Err(_) => return Poll::Ready(Err(ParseError::InvalidChunkSize(line))),
        };

        Poll::Ready(Ok(state))
    }

    fn read_data(&mut self, content: &mut ContentAccumulator, remaining: usize) -> Poll<Result<ChunkedState, ParseError>> {
        let (span, wire_len) = ready!(content.need_bytes(remaining))?;
        let remaining = remaining - wire_len;
        self.body.push_str(&span);

        Poll::Ready(Ok(if remaining == 0 { Size } else { Data { remaining } }))
    }

    fn read_trailer(&mut self, content: &mut ContentAccumulator) -> Poll<Result<ChunkedState, ParseError>> {
        let line = ready!(content.need_line(true))?;
        if line.is_empty() {
            return Poll::Ready(Ok(End));
        }

        // trailer fields share the header field limit
        if self.trailers >= self.max_trailers {
            return Poll::Ready(Err(ParseError::too_many_headers(self.max_trailers)));
        }
        self.trailers += 1;

        trace!(trailer = line, "discard chunk trailer");
        Poll::Ready(Ok(Trailer))
    }
}
