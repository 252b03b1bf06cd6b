//! Incremental HTTP response parser.
//!
//! [`ResponseParser`] turns an arbitrarily fragmented byte stream into a queue
//! of complete [`Response`]s. The caller owns the socket: it calls
//! [`feed`](ResponseParser::feed) with whatever bytes a read produced, then
//! [`parse`](ResponseParser::parse), then drains the completed responses.
//!
//! # State Machine
//!
//! ```text
//! NotStarted -> StatusLine -> Headers -> Body -> Completed -> NotStarted
//! ```
//!
//! Each step either finishes, suspends because the buffered content is
//! insufficient, or fails with a fatal [`ParseError`]. A suspended step keeps
//! everything it already read (headers, partial body, chunk position) and
//! resumes at the same byte on the next `parse`.
//!
//! # Body-only framing
//!
//! Once a keep-alive response announces a streaming content type (for example
//! `text/event-stream`), the parser stops looking for status lines and headers
//! for the rest of the connection. Every later `parse` frames whatever is
//! buffered as the body of a new `200 OK` response.
//!
//! # Example
//!
//! ```
//! use micro_framing::codec::{ParseStatus, ResponseParser};
//!
//! let mut parser = ResponseParser::default();
//!
//! parser.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nab\n");
//! assert_eq!(parser.parse().unwrap(), ParseStatus::NeedMoreData);
//! assert!(parser.is_missing_content());
//!
//! parser.feed(b"cd");
//! assert_eq!(parser.parse().unwrap(), ParseStatus::Idle);
//! assert_eq!(parser.next_response().unwrap().body(), "ab\ncd");
//! ```

use std::collections::VecDeque;
use std::collections::vec_deque::Drain;
use std::mem;
use std::task::{Poll, ready};
use std::time::{Duration, Instant};

use http::{StatusCode, Version};
use tracing::{debug, error, trace};

use crate::codec::chunked_decoder::ChunkedDecoder;
use crate::codec::content::ContentAccumulator;
use crate::config::ParserConfig;
use crate::ensure;
use crate::protocol::{Headers, ParseError, Response, ResponseHeader};

/// Outcome of a [`ResponseParser::parse`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// All buffered content is consumed and no message is in flight
    Idle,
    /// A message is in flight and waits for more input
    NeedMoreData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Step {
    #[default]
    NotStarted,
    StatusLine,
    Headers,
    Body,
    Completed,
}

/// State that lives as long as the connection.
#[derive(Debug)]
struct ConnectionState {
    content: ContentAccumulator,
    headers: Headers,
    responses: VecDeque<Response>,
    body_only: bool,
    /// flags of the most recent header block
    keep_alive: bool,
    stream: bool,
    failed: bool,
}

/// State of the message in flight, reset when it completes.
#[derive(Debug, Default)]
struct MessageState {
    step: Step,
    /// the current step was suspended and is being re-entered
    continuation: bool,
    version: Option<Version>,
    status: Option<StatusCode>,
    reason: String,
    content_length: Option<usize>,
    chunked: bool,
    keep_alive: bool,
    stream: bool,
    body: String,
    /// undelivered part of a fixed-length body
    remaining: Option<usize>,
    chunked_decoder: Option<ChunkedDecoder>,
    out_of_content_since: Option<Instant>,
}

/// Non-blocking response framing for one connection.
///
/// Not shareable across concurrent callers; the owner serializes calls to
/// `feed` and `parse`.
#[derive(Debug)]
pub struct ResponseParser {
    config: ParserConfig,
    connection: ConnectionState,
    message: MessageState,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ResponseParser {
    pub fn new(config: ParserConfig) -> Self {
        Self::with_framing(config, false)
    }

    /// Creates a parser already in body-only framing: no status line or
    /// headers are expected, every parse frames buffered content as a body.
    pub fn body_only(config: ParserConfig) -> Self {
        Self::with_framing(config, true)
    }

    fn with_framing(config: ParserConfig, body_only: bool) -> Self {
        let connection = ConnectionState {
            content: ContentAccumulator::new(&config),
            headers: Headers::with_capacity(8),
            responses: VecDeque::with_capacity(2),
            body_only,
            keep_alive: false,
            stream: false,
            failed: false,
        };

        Self { config, connection, message: MessageState::default() }
    }

    /// Appends bytes read from the peer. Never fails; nothing is parsed until
    /// [`parse`](Self::parse) is called.
    ///
    /// New bytes count as progress: the missing-content timer restarts at the
    /// next suspension.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.connection.failed {
            trace!(len = bytes.len(), "parser aborted, drop incoming bytes");
            return;
        }
        if bytes.is_empty() {
            return;
        }

        self.message.out_of_content_since = None;
        self.connection.content.feed(bytes);
    }

    /// Runs the state machine until all buffered content is consumed or the
    /// message in flight needs more input.
    ///
    /// # Errors
    ///
    /// Returns the framing error that aborted the current message. The parser
    /// is unusable afterwards and every later call returns [`ParseError::Aborted`].
    pub fn parse(&mut self) -> Result<ParseStatus, ParseError> {
        ensure!(!self.connection.failed, ParseError::Aborted);

        loop {
            if self.is_idle() {
                self.connection.content.compact();
                return Ok(ParseStatus::Idle);
            }

            match self.step() {
                Poll::Ready(Ok(next)) => {
                    trace!(from = ?self.message.step, to = ?next, "step finished");
                    self.message.step = next;
                }
                Poll::Ready(Err(e)) => {
                    error!(cause = %e, step = ?self.message.step, "fatal framing error, abort parser");
                    self.connection.failed = true;
                    return Err(e);
                }
                // only blank lines between two responses
                Poll::Pending if self.message.step == Step::StatusLine && self.connection.content.is_idle() => {
                    self.message = MessageState::default();
                    return Ok(ParseStatus::Idle);
                }
                Poll::Pending => {
                    self.suspend();
                    return Ok(ParseStatus::NeedMoreData);
                }
            }
        }
    }

    /// Pops the oldest completed response
    pub fn next_response(&mut self) -> Option<Response> {
        self.connection.responses.pop_front()
    }

    pub fn has_response(&self) -> bool {
        !self.connection.responses.is_empty()
    }

    /// Drains every completed response, oldest first
    pub fn drain(&mut self) -> Drain<'_, Response> {
        self.connection.responses.drain(..)
    }

    /// True when no message is in flight and all buffered content is consumed
    pub fn is_idle(&self) -> bool {
        self.message.step == Step::NotStarted && self.connection.content.is_idle()
    }

    /// Whether the latest header block asked for `Connection: keep-alive`
    pub fn is_keep_alive(&self) -> bool {
        self.connection.keep_alive
    }

    /// Whether the latest header block carried a streaming content type
    pub fn is_stream_content_type(&self) -> bool {
        self.connection.stream
    }

    /// Whether the parser has switched to body-only framing
    pub fn is_stream_mode(&self) -> bool {
        self.connection.body_only
    }

    /// True while a message is suspended waiting for more input
    pub fn is_missing_content(&self) -> bool {
        self.message.out_of_content_since.is_some()
    }

    /// True once the message in flight has been waiting for input for longer
    /// than `limit` since the last suspension that followed new input. Always
    /// false when nothing is missing.
    pub fn has_missing_content_time_expired(&self, limit: Duration) -> bool {
        self.has_missing_content_time_expired_at(limit, Instant::now())
    }

    pub fn has_missing_content_time_expired_at(&self, limit: Duration, now: Instant) -> bool {
        self.message.out_of_content_since.is_some_and(|since| now.saturating_duration_since(since) > limit)
    }

    /// Read position inside the active buffer
    pub fn cursor(&self) -> usize {
        self.connection.content.cursor()
    }

    /// Bytes beyond the character count of the unconsumed buffered text
    pub fn overhead(&self) -> usize {
        self.connection.content.overhead()
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn step(&mut self) -> Poll<Result<Step, ParseError>> {
        match self.message.step {
            Step::NotStarted => Poll::Ready(Ok(Step::StatusLine)),
            Step::StatusLine => self.parse_status_line(),
            Step::Headers => self.parse_headers(),
            Step::Body => self.parse_body(),
            Step::Completed => Poll::Ready(Ok(self.complete())),
        }
    }

    fn suspend(&mut self) {
        self.message.continuation = true;
        self.message.out_of_content_since.get_or_insert_with(Instant::now);
        trace!(step = ?self.message.step, cursor = self.cursor(), "insufficient content, suspend");
    }

    fn parse_status_line(&mut self) -> Poll<Result<Step, ParseError>> {
        if self.connection.body_only {
            self.message.version = Some(Version::HTTP_11);
            self.message.status = Some(StatusCode::OK);
            return Poll::Ready(Ok(Step::Headers));
        }

        self.message.continuation = false;
        let line = ready!(self.connection.content.need_line(false))?;
        let (version, status, reason) = parse_status_line(&line)?;

        self.message.version = Some(version);
        self.message.status = Some(status);
        self.message.reason = reason;
        Poll::Ready(Ok(Step::Headers))
    }

    fn parse_headers(&mut self) -> Poll<Result<Step, ParseError>> {
        if self.connection.body_only {
            return Poll::Ready(Ok(Step::Body));
        }

        if !mem::take(&mut self.message.continuation) {
            self.connection.headers.clear();
        }

        loop {
            let line = ready!(self.connection.content.need_line(true))?;
            if line.is_empty() {
                break;
            }
            self.add_header(ResponseHeader::from_line(&line))?;
        }

        self.connection.keep_alive = self.message.keep_alive;
        self.connection.stream = self.message.stream;

        trace!(
            headers = self.connection.headers.len(),
            content_length = ?self.message.content_length,
            chunked = self.message.chunked,
            "parsed headers"
        );
        Poll::Ready(Ok(Step::Body))
    }

    fn add_header(&mut self, header: ResponseHeader) -> Result<(), ParseError> {
        let max_headers = self.config.max_headers();
        ensure!(self.connection.headers.len() < max_headers, ParseError::too_many_headers(max_headers));

        // first Content-Length wins, later duplicates are not even parsed
        if self.message.content_length.is_none()
            && let Some(length) = header.content_length().transpose()?
        {
            let max_body = self.config.max_body_bytes();
            ensure!(length <= max_body, ParseError::too_large_body(length, max_body));
            self.message.content_length = Some(length);
        }

        self.message.chunked |= header.is_chunked_transfer_encoding();
        self.message.keep_alive |= header.is_keep_alive();
        self.message.stream |= header.is_stream_content_type();

        self.connection.headers.push(header);
        Ok(())
    }

    fn parse_body(&mut self) -> Poll<Result<Step, ParseError>> {
        self.message.continuation = false;

        if self.connection.body_only {
            self.message.body = self.connection.content.take_all();
            return Poll::Ready(Ok(Step::Completed));
        }

        if let Some(length) = self.message.content_length.filter(|length| *length > 0) {
            let remaining = self.message.remaining.get_or_insert(length);
            while *remaining > 0 {
                let (span, wire_len) = ready!(self.connection.content.need_bytes(*remaining))?;
                *remaining -= wire_len;
                self.message.body.push_str(&span);
            }
        } else if self.message.chunked {
            let decoder = self.message.chunked_decoder.get_or_insert_with(|| ChunkedDecoder::new(&self.config));
            self.message.body = ready!(decoder.decode(&mut self.connection.content))?;
        }

        Poll::Ready(Ok(Step::Completed))
    }

    fn complete(&mut self) -> Step {
        let message = mem::take(&mut self.message);
        let response = Response::new(
            message.version.unwrap_or_default(),
            message.status.unwrap_or_default(),
            message.reason,
            mem::take(&mut self.connection.headers),
            message.body,
        );

        debug!(status = %response.status(), body_len = response.body().len(), "framed response");
        self.connection.responses.push_back(response);

        if !self.connection.body_only && message.keep_alive && message.stream {
            debug!("keep-alive stream response, switch to body-only framing");
            self.connection.body_only = true;
        }

        Step::NotStarted
    }
}

/// Splits `<version> <code> [reason]`.
fn parse_status_line(line: &str) -> Result<(Version, StatusCode, String), ParseError> {
    let Some((version, rest)) = line.split_once(' ') else {
        return Err(ParseError::invalid_status_line(format!("missing status in {line:?}")));
    };

    let version = match version.trim() {
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/2" | "HTTP/2.0" => Version::HTTP_2,
        other => return Err(ParseError::InvalidVersion(other.to_owned())),
    };

    let rest = rest.trim();
    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    let status = StatusCode::from_bytes(code.as_bytes()).map_err(|e| ParseError::InvalidStatus(format!("{code}: {e}")))?;
    ensure!(status.canonical_reason().is_some(), ParseError::InvalidStatus(code.to_owned()));

    Ok((version, status, reason.trim().to_owned()))
}
