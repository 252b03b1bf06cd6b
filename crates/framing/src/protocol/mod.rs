//! Protocol types produced and consumed by the framing engine.
//!
//! - [`Response`]: a fully framed response (version, status, ordered headers, body)
//! - [`ResponseHeader`] / [`Headers`]: the header model, with the predicates the
//!   parser needs to choose a body framing
//! - [`ParseError`] / [`HttpError`]: fatal framing errors and connection-level failures

mod header;
pub use header::Headers;
pub use header::ResponseHeader;

mod response;
pub use response::Response;

mod error;
pub use error::HttpError;
pub use error::ParseError;
