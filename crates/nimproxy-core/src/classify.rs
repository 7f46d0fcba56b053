use bytes::Bytes;

use nimproxy_protocol::ChatCompletionRequestBody;

use crate::error::ProxyError;

#[derive(Debug, Clone)]
pub struct ProxyClassified {
    pub body: ChatCompletionRequestBody,
    pub is_stream: bool,
}

/// Parses and validates the inbound chat-completion body.
///
/// `messages` must be present and non-empty; everything else is coerced later
/// by the transform. Failures map to 400 `invalid_request_error`.
pub fn classify_request(body: &Bytes) -> Result<ProxyClassified, ProxyError> {
    if body.is_empty() {
        return Err(ProxyError::invalid_request("request body is required"));
    }
    let parsed: ChatCompletionRequestBody = serde_json::from_slice(body)
        .map_err(|err| ProxyError::invalid_request(format!("invalid request body: {err}")))?;
    match parsed.messages.as_deref() {
        None => Err(ProxyError::invalid_request("messages is required")),
        Some([]) => Err(ProxyError::invalid_request("messages must not be empty")),
        Some(_) => {
            let is_stream = parsed.stream.unwrap_or(false);
            Ok(ProxyClassified {
                body: parsed,
                is_stream,
            })
        }
    }
}
