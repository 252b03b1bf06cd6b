//! Framed HTTP response.
//!
//! A [`Response`] is produced by the parser once status line, headers and
//! body have all been read. It is immutable from then on.

use http::header::{HeaderName, HeaderValue};
use http::{StatusCode, Version};
use tracing::trace;

use crate::protocol::{Headers, ResponseHeader};

/// A completely framed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    version: Version,
    status: StatusCode,
    reason: String,
    headers: Headers,
    body: String,
}

impl Response {
    pub fn new(version: Version, status: StatusCode, reason: String, headers: Headers, body: String) -> Self {
        Self { version, status, reason, headers, body }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase as sent by the peer, may be empty
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Value of the first header with the given name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(ResponseHeader::value)
    }

    /// Values of every header with the given name, in arrival order
    pub fn headers_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.get_all(name).map(ResponseHeader::value)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Converts into an `http::Response`.
    ///
    /// Headers whose name or value is not valid for the `http` crate are
    /// dropped; duplicates are appended in arrival order.
    pub fn into_http(self) -> http::Response<String> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;

        let headers = response.headers_mut();
        headers.reserve(self.headers.len());
        for header in &self.headers {
            match (HeaderName::from_bytes(header.name().as_bytes()), HeaderValue::from_str(header.value())) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => trace!(name = header.name(), "skip header not representable as http header"),
            }
        }

        response
    }
}
