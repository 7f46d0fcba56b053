use std::io;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use nimproxy_protocol::ErrorBody;

use crate::error::ProxyError;
use crate::upstream_client::ByteStream;

const STREAM_CONTENT_TYPE: &str = "text/event-stream";
// Bounded so caller backpressure pauses the upstream read.
const RELAY_CHANNEL_CAPACITY: usize = 16;

pub fn json_response(status: StatusCode, body: Bytes) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

pub fn error_response(err: &ProxyError) -> Response {
    json_response(err.status, err.body())
}

/// Relays an upstream byte stream to the caller as `text/event-stream`.
///
/// Upstream bytes are re-chunked on line boundaries: every complete non-empty
/// line is forwarded immediately with a single trailing newline, in order.
/// The sequence is finite (ends when upstream ends) and not restartable. A
/// mid-stream failure becomes one final `data:` error event before the stream
/// closes.
pub fn stream_response(upstream: ByteStream) -> Response {
    let (tx, rx) = mpsc::channel::<Bytes>(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(pump_lines(upstream, tx));

    let stream = ReceiverStream::new(rx).map(Ok::<_, io::Error>);
    let mut resp = Response::new(Body::from_stream(stream));
    *resp.status_mut() = StatusCode::OK;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(STREAM_CONTENT_TYPE));
    resp
}

async fn pump_lines(mut upstream: ByteStream, tx: mpsc::Sender<Bytes>) {
    let mut buffer = LineBuffer::new();
    while let Some(item) = upstream.recv().await {
        match item {
            Ok(chunk) => {
                for line in buffer.push(&chunk) {
                    if tx.send(line).await.is_err() {
                        // Caller went away; dropping `upstream` stops the read.
                        return;
                    }
                }
            }
            Err(message) => {
                let _ = tx.send(error_event(&message)).await;
                return;
            }
        }
    }
    if let Some(line) = buffer.finish() {
        let _ = tx.send(line).await;
    }
}

fn error_event(message: &str) -> Bytes {
    let body = ErrorBody::new("server_error", message);
    let data = serde_json::to_string(&body).unwrap_or_else(|_| {
        String::from("{\"error\":{\"message\":\"stream failure\",\"type\":\"server_error\"}}")
    });
    Bytes::from(format!("data: {data}\n"))
}

/// Stateful splitter turning arbitrary byte chunks into complete lines.
/// Operates on raw bytes: chunk boundaries may fall inside a multi-byte
/// character, so no UTF-8 decoding happens here — lines are forwarded
/// verbatim. Tolerates `\r\n`; partial trailing data stays buffered until the
/// next push or [`LineBuffer::finish`].
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, chunk: &Bytes) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            line.push(b'\n');
            out.push(Bytes::from(line));
        }
        out
    }

    fn finish(&mut self) -> Option<Bytes> {
        let mut line = std::mem::take(&mut self.buffer);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.is_empty() {
            return None;
        }
        line.push(b'\n');
        Some(Bytes::from(line))
    }
}
