//! An incremental, non-blocking HTTP response framing engine
//!
//! This crate turns an arbitrarily fragmented byte stream, as delivered by a
//! non-blocking socket reader one chunk at a time, into a sequence of complete
//! HTTP responses. Parsing can be suspended at any byte offset (mid status
//! line, mid header, mid chunk size, mid chunk payload) and resumes exactly
//! where it stopped, without reprocessing or duplicating bytes.
//!
//! # Features
//!
//! - Status line and header parsing with CRLF or bare LF line endings
//! - `Content-Length` and `Transfer-Encoding: chunked` bodies
//! - UTF-8 decoding across read boundaries
//! - Pipelined responses, framed strictly in arrival order
//! - Body-only framing for keep-alive event streams
//! - Caller driven timeouts for peers that stop mid-response
//!
//! # Example
//!
//! ```
//! use micro_framing::codec::{ParseStatus, ResponseParser};
//!
//! let mut parser = ResponseParser::default();
//!
//! for piece in [&b"HTTP/1.1 200 OK\r\nTransfer-Enc"[..], b"oding: chunked\r\n\r\n4\r\nWiki\r\n", b"5\r\npedia\r\n0\r\n\r\n"] {
//!     parser.feed(piece);
//!     parser.parse().expect("well formed response");
//! }
//!
//! let response = parser.next_response().unwrap();
//! assert_eq!(response.body(), "Wikipedia");
//! assert_eq!(parser.parse().unwrap(), ParseStatus::Idle);
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the parser state machine and its `tokio_util` decoder adapter
//! - [`protocol`]: response, header model and error types
//! - [`connection`]: reading responses off an `AsyncRead` with stall detection
//! - [`config`]: limits and framing policies
//!
//! ## Error Handling
//!
//! - [`protocol::ParseError`]: fatal framing errors; after one the parser is aborted
//! - [`protocol::HttpError`]: connection level errors, including stalled peers
//!
//! Running out of input is not an error: the parser reports
//! [`codec::ParseStatus::NeedMoreData`] and waits for the next feed.
//!
//! # Limitations
//!
//! - No TLS and no connection pooling
//! - Chunk trailers are skipped, not exposed
//! - Bodies are decoded as UTF-8 text; invalid sequences become U+FFFD

pub mod codec;
pub mod config;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
