//! Header model used while framing responses.
//!
//! Headers are kept as an ordered, duplicate-preserving list rather than a
//! `HeaderMap`, so a framed [`Response`](super::Response) reproduces the exact
//! order the peer sent them in. Name comparisons are ASCII case-insensitive and
//! reuse the `http` crate's well-known header names.

use std::slice;

use http::HeaderName;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use mime::Mime;
use tracing::warn;

use crate::protocol::ParseError;

/// A single `Name: value` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    name: String,
    value: String,
}

impl ResponseHeader {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    /// Parses a `Name: value` line, trimming both parts.
    ///
    /// A line without a colon does not fail: the whole line becomes the name
    /// and the value is left empty.
    pub fn from_line(line: &str) -> Self {
        match line.split_once(':') {
            Some((name, value)) => Self::new(name.trim(), value.trim()),
            None => {
                warn!(line, "malformed header line, keeping it with an empty value");
                Self::new(line.trim(), "")
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive name match
    #[inline]
    pub fn is_named(&self, name: &HeaderName) -> bool {
        self.name.eq_ignore_ascii_case(name.as_str())
    }

    /// Returns the parsed length if this is a `Content-Length` header.
    pub fn content_length(&self) -> Option<Result<usize, ParseError>> {
        if !self.is_named(&CONTENT_LENGTH) {
            return None;
        }

        Some(
            self.value
                .parse::<usize>()
                .map_err(|e| ParseError::invalid_content_length(format!("value {} is not usize: {e}", self.value))),
        )
    }

    /// True when `chunked` is the final coding of a `Transfer-Encoding` header.
    pub fn is_chunked_transfer_encoding(&self) -> bool {
        self.is_named(&TRANSFER_ENCODING)
            && self.value.rsplit(',').next().is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    }

    /// True for a `Connection` header listing `keep-alive`.
    pub fn is_keep_alive(&self) -> bool {
        self.is_named(&CONNECTION) && self.value.split(',').any(|token| token.trim().eq_ignore_ascii_case("keep-alive"))
    }

    /// True for a `Content-Type` whose subtype is a stream, such as
    /// `text/event-stream` or `application/octet-stream`.
    pub fn is_stream_content_type(&self) -> bool {
        if !self.is_named(&CONTENT_TYPE) {
            return false;
        }

        match self.value.parse::<Mime>() {
            Ok(mime) => mime.subtype().as_str().to_ascii_lowercase().ends_with("-stream"),
            Err(_) => self.value.to_ascii_lowercase().contains("-stream"),
        }
    }
}

/// Ordered header collection which keeps duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<ResponseHeader>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, header: ResponseHeader) {
        self.inner.push(header);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// First header with the given name
    pub fn get(&self, name: &str) -> Option<&ResponseHeader> {
        self.inner.iter().find(|header| header.name.eq_ignore_ascii_case(name))
    }

    /// All headers with the given name, in arrival order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResponseHeader> + 'a {
        self.inner.iter().filter(move |header| header.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> slice::Iter<'_, ResponseHeader> {
        self.inner.iter()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a ResponseHeader;
    type IntoIter = slice::Iter<'a, ResponseHeader>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl FromIterator<ResponseHeader> for Headers {
    fn from_iter<T: IntoIterator<Item = ResponseHeader>>(iter: T) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}
