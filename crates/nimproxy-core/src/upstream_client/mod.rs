use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use wreq::{Client, Method};

pub mod dispatch;

pub type Headers = Vec<(String, String)>;

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    let key = name.to_ascii_lowercase();
    headers
        .iter()
        .find(|(k, _)| k.to_ascii_lowercase() == key)
        .map(|(_, v)| v.as_str())
}

/// Streamed upstream body. The `Err` variant carries a mid-stream failure
/// message so the relay can surface it instead of dropping the connection.
pub type ByteStream = tokio::sync::mpsc::Receiver<Result<Bytes, String>>;

#[derive(Debug)]
pub enum UpstreamBody {
    Bytes(Bytes),
    Stream(ByteStream),
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}

#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
    pub is_stream: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Transport-level failure (no HTTP response was obtained).
#[derive(Debug, Clone)]
pub struct UpstreamTransportError {
    pub kind: UpstreamTransportErrorKind,
    pub message: String,
}

/// Single-attempt transport seam. Retry policy lives above this trait, in
/// [`dispatch::Dispatcher`]; implementations perform exactly one HTTP call.
pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<
        Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamTransportError>> + Send + 'a>,
    >;
}

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub connect_timeout: Duration,
    /// Per-attempt budget for buffered requests. Streaming requests are not
    /// deadline-bound as a whole (they close when upstream closes); only the
    /// idle guard applies to them.
    pub request_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            stream_idle_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct WreqUpstreamClient {
    config: UpstreamClientConfig,
    client: Client,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, wreq::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.stream_idle_timeout)
            .build()?;
        Ok(Self { config, client })
    }
}

/// Whole-request deadline for one attempt. `None` for streaming requests: a
/// long completion must not be cut off mid-stream, so only the idle guard
/// bounds those.
pub fn attempt_timeout(config: &UpstreamClientConfig, is_stream: bool) -> Option<Duration> {
    if is_stream {
        None
    } else {
        Some(config.request_timeout)
    }
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<
        Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamTransportError>> + Send + 'a>,
    > {
        Box::pin(async move {
            let mut builder = self.client.request(Method::POST, &req.url);
            for (k, v) in &req.headers {
                builder = builder.header(k, v);
            }
            if let Some(timeout) = attempt_timeout(&self.config, req.is_stream) {
                builder = builder.timeout(timeout);
            }
            builder = builder.body(req.body);

            let resp = builder.send().await.map_err(map_wreq_error)?;
            convert_response(resp, req.is_stream, self.config.stream_idle_timeout).await
        })
    }
}

async fn convert_response(
    resp: wreq::Response,
    want_stream: bool,
    stream_idle_timeout: Duration,
) -> Result<UpstreamHttpResponse, UpstreamTransportError> {
    let status = resp.status().as_u16();
    let headers = headers_from_wreq(resp.headers());

    let is_success = (200..300).contains(&status);
    if !is_success || !want_stream {
        let body = resp.bytes().await.map_err(map_wreq_error)?;
        return Ok(UpstreamHttpResponse {
            status,
            headers,
            body: UpstreamBody::Bytes(body),
        });
    }

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, String>>(16);
    tokio::spawn(async move {
        let mut stream = resp.bytes_stream();
        loop {
            let next = tokio::time::timeout(stream_idle_timeout, stream.next()).await;
            let item = match next {
                Ok(item) => item,
                Err(_) => {
                    let _ = tx.send(Err("upstream stream idle timeout".to_string())).await;
                    break;
                }
            };
            let Some(item) = item else {
                break;
            };
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = tx.send(Err(err.to_string())).await;
                    break;
                }
            };
            if tx.send(Ok(chunk)).await.is_err() {
                // Caller went away; stop reading from upstream.
                break;
            }
        }
    });

    Ok(UpstreamHttpResponse {
        status,
        headers,
        body: UpstreamBody::Stream(rx),
    })
}

fn headers_from_wreq(map: &wreq::header::HeaderMap) -> Headers {
    let mut out = Vec::new();
    for (k, v) in map {
        if let Ok(s) = v.to_str() {
            out.push((k.as_str().to_string(), s.to_string()));
        }
    }
    out
}

fn map_wreq_error(err: wreq::Error) -> UpstreamTransportError {
    UpstreamTransportError {
        kind: classify_wreq_error(&err),
        message: err.to_string(),
    }
}

fn classify_wreq_error(err: &wreq::Error) -> UpstreamTransportErrorKind {
    if err.is_timeout() {
        return UpstreamTransportErrorKind::Timeout;
    }
    if err.is_connect() || err.is_connection_reset() {
        return UpstreamTransportErrorKind::Connect;
    }
    UpstreamTransportErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_attempts_are_deadline_bound_streams_are_not() {
        let config = UpstreamClientConfig::default();
        assert_eq!(
            attempt_timeout(&config, false),
            Some(config.request_timeout)
        );
        assert_eq!(attempt_timeout(&config, true), None);
    }
}
