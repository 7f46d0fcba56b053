use nimproxy_protocol::{ChatCompletionRequestBody, UpstreamPayload};

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_MAX_TOKENS: i64 = 512;
const TEMPERATURE_CAP: f64 = 1.0;
const MAX_TOKENS_CAP: i64 = 2048;

/// Maps a validated inbound request onto the NIM schema.
///
/// Pure coercion, never fails: absent fields get defaults, `temperature` and
/// `max_tokens` are clamped from above. There is no lower-bound clamp, and
/// `top_p` is passed through unclamped (observed upstream behavior, kept
/// as is).
pub fn to_upstream(request: &ChatCompletionRequestBody, default_model: &str) -> UpstreamPayload {
    let model = match request.model.as_deref() {
        Some(model) if !model.trim().is_empty() => model.to_string(),
        _ => default_model.to_string(),
    };
    UpstreamPayload {
        model,
        messages: request.messages.clone().unwrap_or_default(),
        temperature: request
            .temperature
            .unwrap_or(DEFAULT_TEMPERATURE)
            .min(TEMPERATURE_CAP),
        top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
        max_tokens: request
            .max_tokens
            .unwrap_or(DEFAULT_MAX_TOKENS)
            .min(MAX_TOKENS_CAP),
        stream: request.stream.unwrap_or(false),
    }
}
