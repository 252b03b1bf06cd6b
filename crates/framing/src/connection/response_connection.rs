use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{error, info, trace, warn};

use crate::codec::{ResponseDecoder, ResponseParser};
use crate::config::ParserConfig;
use crate::protocol::{HttpError, Response};

/// Reads framed responses off one connection.
///
/// `ResponseConnection` owns the read half of a socket and the parser for it.
/// A peer that starts a response and then stops sending is given
/// [`missing_content_timeout`](ParserConfig::missing_content_timeout) to
/// continue; after that [`next_response`](Self::next_response) fails with
/// [`HttpError::Stalled`]. Waiting between responses is never a stall.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
#[derive(Debug)]
pub struct ResponseConnection<R> {
    framed_read: FramedRead<R, ResponseDecoder>,
    missing_content_timeout: Duration,
}

impl<R> ResponseConnection<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, config: ParserConfig) -> Self {
        Self::with_decoder(reader, ResponseDecoder::new(config), config)
    }

    /// Connection whose responses carry no status line or headers, such as
    /// a stream resumed after its header block was already consumed.
    pub fn body_only(reader: R, config: ParserConfig) -> Self {
        Self::with_decoder(reader, ResponseDecoder::body_only(config), config)
    }

    fn with_decoder(reader: R, decoder: ResponseDecoder, config: ParserConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            missing_content_timeout: config.missing_content_timeout(),
        }
    }

    /// Waits for the next complete response.
    ///
    /// Returns `Ok(None)` once the peer closed the connection between responses.
    pub async fn next_response(&mut self) -> Result<Option<Response>, HttpError> {
        loop {
            match timeout(self.missing_content_timeout, self.framed_read.next()).await {
                Ok(Some(Ok(response))) => return Ok(Some(response)),

                Ok(Some(Err(e))) => {
                    error!(cause = %e, "can't frame next response");
                    return Err(e.into());
                }

                Ok(None) => {
                    info!("peer closed connection, no more responses");
                    return Ok(None);
                }

                Err(_elapsed) => {
                    if self.parser().has_missing_content_time_expired(self.missing_content_timeout) {
                        warn!(timeout = ?self.missing_content_timeout, "peer stalled in the middle of a response");
                        return Err(HttpError::Stalled { waited: self.missing_content_timeout });
                    }
                    trace!("no partial response pending, keep waiting");
                }
            }
        }
    }

    pub fn parser(&self) -> &ResponseParser {
        self.framed_read.decoder().parser()
    }

    pub fn is_keep_alive(&self) -> bool {
        self.parser().is_keep_alive()
    }

    pub fn is_stream_mode(&self) -> bool {
        self.parser().is_stream_mode()
    }

    pub fn into_inner(self) -> R {
        self.framed_read.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use tokio::io::AsyncWriteExt;

    fn config() -> ParserConfig {
        ParserConfig::default().with_missing_content_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn reads_responses_until_close() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::new(reader, config());

        tokio::spawn(async move {
            writer.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await.unwrap();
            writer.write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n").await.unwrap();
        });

        let first = connection.next_response().await.unwrap().unwrap();
        assert_eq!(first.body(), "ok");

        let second = connection.next_response().await.unwrap().unwrap();
        assert_eq!(second.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert!(connection.next_response().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn event_stream_switches_to_body_only() {
        let (mut writer, reader) = tokio::io::duplex(256);
        let mut connection = ResponseConnection::new(reader, config());

        writer
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        let head = connection.next_response().await.unwrap().unwrap();
        assert_eq!(head.header("content-type"), Some("text/event-stream"));
        assert!(connection.is_keep_alive());
        assert!(connection.is_stream_mode());

        writer.write_all(b"event: tick\ndata: 1\n\n").await.unwrap();
        let event = connection.next_response().await.unwrap().unwrap();
        assert_eq!(event.body(), "event: tick\ndata: 1\n\n");
    }

    #[tokio::test]
    async fn stalled_peer_times_out() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::new(reader, config());

        writer.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").await.unwrap();

        let result = connection.next_response().await;
        assert!(matches!(result, Err(HttpError::Stalled { .. })));
        assert!(connection.parser().is_missing_content());

        drop(writer);
    }

    #[tokio::test]
    async fn slow_peer_making_progress_is_not_stalled() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::new(reader, config());

        tokio::spawn(async move {
            writer.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n").await.unwrap();
            for byte in b"0123456789" {
                tokio::time::sleep(Duration::from_millis(20)).await;
                writer.write_all(&[*byte]).await.unwrap();
            }
            writer
        });

        let response = connection.next_response().await.unwrap().unwrap();
        assert_eq!(response.body(), "0123456789");
        assert!(!connection.parser().is_missing_content());
    }

    #[tokio::test]
    async fn idle_connection_is_not_stalled() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::new(reader, config());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            writer.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await.unwrap();
        });

        let response = connection.next_response().await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn framing_error_is_reported() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::new(reader, config());

        writer.write_all(b"SPDY/3 200 OK\r\n\r\n").await.unwrap();

        let result = connection.next_response().await;
        assert!(matches!(result, Err(HttpError::ResponseError { .. })));
    }

    #[tokio::test]
    async fn body_only_connection() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut connection = ResponseConnection::body_only(reader, config());

        writer.write_all(b"data: resumed\n\n").await.unwrap();
        let event = connection.next_response().await.unwrap().unwrap();
        assert_eq!(event.body(), "data: resumed\n\n");
        assert!(connection.is_stream_mode());

        drop(connection.into_inner());
        drop(writer);
    }
}
