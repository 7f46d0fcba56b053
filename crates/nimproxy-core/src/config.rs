use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_MODEL: &str = "meta/llama-3.1-405b-instruct";

/// Final, immutable global configuration used by the running process.
///
/// Built once at startup (CLI flags with env fallbacks) and shared read-only
/// behind `Arc`; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Upstream bearer credential. When absent, chat requests are answered
    /// with a `configuration_error`; the other routes keep working.
    pub api_key: Option<String>,
    /// Base URL of the NIM endpoint, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model substituted when the caller omits one.
    pub default_model: String,
}

impl GlobalConfig {
    /// The credential, if it is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn api_key_configured(&self) -> bool {
        self.api_key().is_some()
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}
