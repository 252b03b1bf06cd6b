//! Parser limits and framing policies.
//!
//! [`ParserConfig`] is a small value type handed to a
//! [`ResponseParser`](crate::codec::ResponseParser) at construction time.
//! Every limit has a default that suits a typical client talking to a
//! well-behaved server; tighten them when the peer is untrusted.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use micro_framing::config::ParserConfig;
//!
//! let config = ParserConfig::default()
//!     .with_max_headers(32)
//!     .with_lenient_chunk_size(false)
//!     .with_missing_content_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.max_headers(), 32);
//! assert!(!config.lenient_chunk_size());
//! ```

use std::time::Duration;

/// Default maximum length of a single status, header or chunk-size line
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024;

/// Default maximum number of headers in one message
pub const DEFAULT_MAX_HEADERS: usize = 64;

/// Default maximum size of a decoded body
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Default size of unconsumed text above which input is queued instead of merged
pub const DEFAULT_MERGE_THRESHOLD: usize = 64 * 1024;

/// Default time a connection may wait for the rest of a partial message
pub const DEFAULT_MISSING_CONTENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Limits and policies applied by the response parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    max_line_bytes: usize,
    max_headers: usize,
    max_body_bytes: usize,
    merge_threshold: usize,
    lenient_chunk_size: bool,
    missing_content_timeout: Duration,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_headers: DEFAULT_MAX_HEADERS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            lenient_chunk_size: true,
            missing_content_timeout: DEFAULT_MISSING_CONTENT_TIMEOUT,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest line accepted before a terminator is seen
    #[must_use]
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    #[must_use]
    pub fn with_max_headers(mut self, max_headers: usize) -> Self {
        self.max_headers = max_headers;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Once the active buffer holds this many unconsumed bytes, further input
    /// is kept as queued fragments and merged only when a read needs it.
    #[must_use]
    pub fn with_merge_threshold(mut self, merge_threshold: usize) -> Self {
        self.merge_threshold = merge_threshold;
        self
    }

    /// When `true`, a chunk-size line that is not valid hex ends the body
    /// instead of failing the message.
    #[must_use]
    pub fn with_lenient_chunk_size(mut self, lenient: bool) -> Self {
        self.lenient_chunk_size = lenient;
        self
    }

    #[must_use]
    pub fn with_missing_content_timeout(mut self, timeout: Duration) -> Self {
        self.missing_content_timeout = timeout;
        self
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn merge_threshold(&self) -> usize {
        self.merge_threshold
    }

    pub fn lenient_chunk_size(&self) -> bool {
        self.lenient_chunk_size
    }

    pub fn missing_content_timeout(&self) -> Duration {
        self.missing_content_timeout
    }
}
