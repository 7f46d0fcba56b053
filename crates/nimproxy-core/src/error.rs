use std::fmt;

use bytes::Bytes;
use http::StatusCode;

use nimproxy_protocol::ErrorBody;

/// Caller-visible error taxonomy. Each kind maps to a fixed `type` string in
/// the JSON error body and (except `Api`) a fixed HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidRequest,
    Authentication,
    RateLimited,
    Timeout,
    Connection,
    Api,
    Server,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::InvalidRequest => "invalid_request_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::RateLimited => "rate_limit_error",
            ErrorKind::Timeout => "timeout_error",
            ErrorKind::Connection => "connection_error",
            ErrorKind::Api => "api_error",
            ErrorKind::Server => "server_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} ({status}): {message}")]
pub struct ProxyError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
}

impl ProxyError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Configuration,
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, StatusCode::BAD_REQUEST, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, StatusCode::UNAUTHORIZED, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, StatusCode::GATEWAY_TIMEOUT, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Non-200 upstream response surfaced verbatim under its own status.
    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, status, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The `{"error": {"message", "type"}}` JSON body for this error.
    pub fn body(&self) -> Bytes {
        serde_json::to_vec(&ErrorBody::new(self.kind.as_str(), &self.message))
            .map(Bytes::from)
            .unwrap_or_else(|_| {
                Bytes::from_static(
                    b"{\"error\":{\"message\":\"error serialization failed\",\"type\":\"server_error\"}}",
                )
            })
    }
}
