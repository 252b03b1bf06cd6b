//! Response framing codec.
//!
//! Bytes flow through the codec in one direction:
//!
//! ```text
//! feed(bytes) -> text bridge -> content accumulator -> response parser -> response queue
//!                                                          |
//!                                                   chunked decoder
//! ```
//!
//! - [`ResponseParser`]: the non-blocking state machine, driven by `feed`/`parse`
//! - [`ResponseDecoder`]: the same parser behind `tokio_util::codec::Decoder`
//!
//! Internally the text bridge decodes UTF-8 across read boundaries, the
//! content accumulator owns the buffered text and answers line and span reads,
//! and the chunked decoder handles `Transfer-Encoding: chunked` bodies.

mod chunked_decoder;
mod content;
mod response_decoder;
mod response_parser;
mod text_bridge;

pub use response_decoder::ResponseDecoder;
pub use response_parser::ParseStatus;
pub use response_parser::ResponseParser;
