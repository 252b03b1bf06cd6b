//! Reads a server-sent event stream, e.g. from the `sse_server` example of micro-web.
//!
//! cargo run --example sse_client -- 127.0.0.1:8080 /sse

use micro_framing::config::ParserConfig;
use micro_framing::connection::ResponseConnection;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:8080".to_owned());
    let path = args.next().unwrap_or_else(|| "/sse".to_owned());

    let mut stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(cause = %e, addr, "connect error");
            return;
        }
    };

    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nAccept: text/event-stream\r\nConnection: keep-alive\r\n\r\n");
    if let Err(e) = stream.write_all(request.as_bytes()).await {
        error!(cause = %e, "send request error");
        return;
    }

    let (reader, _writer) = stream.into_split();
    let mut connection = ResponseConnection::new(reader, ParserConfig::default());

    loop {
        match connection.next_response().await {
            Ok(Some(response)) if connection.is_stream_mode() && response.headers().is_empty() => {
                info!(event = response.body(), "received event");
            }
            Ok(Some(response)) => {
                info!(status = %response.status(), stream = connection.is_stream_mode(), "received response head");
            }
            Ok(None) => {
                info!("server closed stream");
                break;
            }
            Err(e) => {
                error!(cause = %e, "stream aborted");
                break;
            }
        }
    }
}
