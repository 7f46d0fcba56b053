use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One entry of the conversation. `content` is kept as raw JSON because the
/// OpenAI shape allows either a string or an array of content parts; both are
/// forwarded verbatim. Unknown sibling fields (`name`, `tool_calls`, ...) ride
/// along through the flattened map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub content: JsonValue,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Inbound OpenAI-style chat completion request.
///
/// Everything is optional at the parse stage; `messages` presence is enforced
/// by the handler before the transform runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatCompletionRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Normalized request body sent to the NIM upstream. All fields are concrete:
/// defaults applied, `temperature` and `max_tokens` clamped from above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: i64,
    pub stream: bool,
}
