use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use tracing::{info, warn};

use nimproxy_protocol::UpstreamPayload;

use super::{
    Headers, UpstreamBody, UpstreamClient, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind, header_get,
};
use crate::error::ProxyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed wait after a transport timeout or connection failure.
    pub transport_backoff: Duration,
    /// Wait after a 429 without a usable `Retry-After` header.
    pub rate_limit_fallback: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_backoff: Duration::from_secs(2),
            rate_limit_fallback: Duration::from_secs(5),
        }
    }
}

/// Tagged result of one dispatch. Consumed immediately by the handler.
#[derive(Debug)]
pub enum UpstreamOutcome {
    Success(UpstreamHttpResponse),
    Failed(ProxyError),
}

/// Retry-loop state between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Attempting,
    Backoff(Duration),
}

/// Issues a transformed payload upstream with bounded retry.
///
/// Transport timeouts, connection failures and 429s are retried with fixed or
/// announced delays; 401 and any other non-2xx surface immediately. No
/// jitter, no exponential growth beyond what `Retry-After` announces.
pub struct Dispatcher {
    client: Arc<dyn UpstreamClient>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn UpstreamClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn dispatch(
        &self,
        payload: &UpstreamPayload,
        base_url: &str,
        api_key: &str,
    ) -> UpstreamOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                return UpstreamOutcome::Failed(ProxyError::server(format!(
                    "failed to encode upstream payload: {err}"
                )));
            }
        };
        let request = UpstreamHttpRequest {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers: vec![
                ("authorization".to_string(), format!("Bearer {api_key}")),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body,
            is_stream: payload.stream,
        };

        let mut state = AttemptState::Attempting;
        let mut attempt_no: u32 = 1;
        while attempt_no <= self.policy.max_attempts {
            if let AttemptState::Backoff(delay) = state {
                tokio::time::sleep(delay).await;
                state = AttemptState::Attempting;
            }
            let attempts_left = attempt_no < self.policy.max_attempts;

            let response = match self.client.send(request.clone()).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(
                        event = "upstream_attempt",
                        attempt_no,
                        kind = ?err.kind,
                        error = %err.message,
                        "transport failure"
                    );
                    let failed = match err.kind {
                        UpstreamTransportErrorKind::Timeout => ProxyError::timeout(err.message),
                        UpstreamTransportErrorKind::Connect
                        | UpstreamTransportErrorKind::Other => ProxyError::connection(err.message),
                    };
                    if attempts_left {
                        state = AttemptState::Backoff(self.policy.transport_backoff);
                        attempt_no += 1;
                        continue;
                    }
                    return UpstreamOutcome::Failed(failed);
                }
            };

            let status = response.status;
            if (200..300).contains(&status) {
                info!(event = "upstream_attempt", attempt_no, status, "success");
                return UpstreamOutcome::Success(response);
            }
            if status == 429 {
                let delay = parse_retry_after(&response.headers)
                    .unwrap_or(self.policy.rate_limit_fallback);
                warn!(
                    event = "upstream_attempt",
                    attempt_no,
                    status,
                    retry_after_ms = delay.as_millis() as u64,
                    "rate limited"
                );
                if attempts_left {
                    state = AttemptState::Backoff(delay);
                    attempt_no += 1;
                    continue;
                }
                return UpstreamOutcome::Failed(ProxyError::rate_limited(
                    "upstream rate limit exceeded",
                ));
            }
            if status == 401 {
                warn!(
                    event = "upstream_attempt",
                    attempt_no, status, "credential rejected"
                );
                return UpstreamOutcome::Failed(ProxyError::authentication(
                    "upstream rejected the configured credential",
                ));
            }
            let message = response_text(response.body);
            warn!(
                event = "upstream_attempt",
                attempt_no,
                status,
                body = %message,
                "upstream error"
            );
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            return UpstreamOutcome::Failed(ProxyError::api(status, message));
        }

        UpstreamOutcome::Failed(ProxyError::server("upstream retry budget exhausted"))
    }
}

fn parse_retry_after(headers: &Headers) -> Option<Duration> {
    let value = header_get(headers, "retry-after")?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let secs = value.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

fn response_text(body: UpstreamBody) -> String {
    match body {
        UpstreamBody::Bytes(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        UpstreamBody::Stream(_) => "<stream>".to_string(),
    }
}
