pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod relay;
pub mod transform;
pub mod upstream_client;

pub use classify::{ProxyClassified, classify_request};
pub use config::GlobalConfig;
pub use core::{AppState, Core};
pub use error::{ErrorKind, ProxyError};
pub use upstream_client::dispatch::{Dispatcher, RetryPolicy, UpstreamOutcome};
pub use upstream_client::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};
