//! [`Decoder`] adapter over [`ResponseParser`].
//!
//! Lets the parser sit under a `tokio_util::codec::FramedRead`: every call
//! hands the freshly read bytes to the parser and yields the oldest completed
//! response, if any.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use micro_framing::codec::ResponseDecoder;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:8080").await?;
//! let mut responses = FramedRead::new(stream, ResponseDecoder::default());
//! while let Some(response) = responses.next().await {
//!     println!("{}", response?.status());
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::codec::ResponseParser;
use crate::config::ParserConfig;
use crate::protocol::{ParseError, Response};

#[derive(Debug, Default)]
pub struct ResponseDecoder {
    parser: ResponseParser,
}

impl ResponseDecoder {
    pub fn new(config: ParserConfig) -> Self {
        Self { parser: ResponseParser::new(config) }
    }

    /// Decoder whose parser starts in body-only framing
    pub fn body_only(config: ParserConfig) -> Self {
        Self { parser: ResponseParser::body_only(config) }
    }

    pub fn parser(&self) -> &ResponseParser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut ResponseParser {
        &mut self.parser
    }

    pub fn into_parser(self) -> ResponseParser {
        self.parser
    }
}

impl Decoder for ResponseDecoder {
    type Item = Response;
    type Error = ParseError;

    /// Feeds everything in `src` to the parser and returns one completed response.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(response))`: the oldest completed response
    /// - `Ok(None)`: need more data to complete a response
    /// - `Err(_)`: a fatal framing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let bytes = src.split();
            self.parser.feed(&bytes);
            self.parser.parse()?;
        }

        Ok(self.parser.next_response())
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(response) = self.decode(buf)? {
            return Ok(Some(response));
        }

        if self.parser.is_idle() {
            Ok(None)
        } else {
            warn!("input ended in the middle of a response");
            Err(ParseError::IncompleteMessage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use http::StatusCode;
    use tokio_util::codec::FramedRead;

    #[test]
    fn test_decode_in_pieces() {
        let mut decoder = ResponseDecoder::default();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Len"[..]);

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(buffer.is_empty());

        buffer.extend_from_slice(b"gth: 2\r\n\r\nokHTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        let first = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.body(), "ok");

        // queued response comes out without new input
        let second = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.status(), StatusCode::NOT_FOUND);

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_eof_mid_message() {
        let mut decoder = ResponseDecoder::default();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort"[..]);
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::IncompleteMessage)));
    }

    struct BrokenReader;

    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer")))
        }
    }

    #[tokio::test]
    async fn test_read_error_surfaces_as_io() {
        let mut framed = FramedRead::new(BrokenReader, ResponseDecoder::default());
        let error = framed.next().await.unwrap().unwrap_err();
        assert!(matches!(error, ParseError::Io { ref source } if source.kind() == std::io::ErrorKind::ConnectionReset));
    }

    #[tokio::test]
    async fn test_framed_read() {
        let input: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nbye";
        let mut framed = FramedRead::new(input, ResponseDecoder::default());

        assert_eq!(framed.next().await.unwrap().unwrap().body(), "hello");
        assert_eq!(framed.next().await.unwrap().unwrap().body(), "bye");
        assert!(framed.next().await.is_none());
    }
}
