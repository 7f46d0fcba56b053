use clap::Parser;

use nimproxy_core::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Parser)]
#[command(name = "nimproxy")]
pub(crate) struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    pub(crate) host: String,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub(crate) port: u16,
    /// Upstream NIM credential. When absent the proxy still starts, but chat
    /// requests are answered with a configuration error.
    #[arg(long, env = "NVIDIA_API_KEY")]
    pub(crate) api_key: Option<String>,
    #[arg(long, env = "NIM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub(crate) base_url: String,
    /// Model substituted when the caller omits one.
    #[arg(long, env = "NIM_DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub(crate) default_model: String,
}
