use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use nimproxy_protocol::Model;

use crate::config::GlobalConfig;
use crate::handler::{chat_completions, health, home, list_models};
use crate::upstream_client::UpstreamClient;
use crate::upstream_client::dispatch::{Dispatcher, RetryPolicy};

/// Read-only per-process state shared by all requests.
pub struct AppState {
    pub config: GlobalConfig,
    pub dispatcher: Dispatcher,
    pub catalog: Vec<Model>,
}

pub struct Core {
    state: Arc<AppState>,
}

impl Core {
    pub fn new(config: GlobalConfig, client: Arc<dyn UpstreamClient>, policy: RetryPolicy) -> Self {
        Self {
            state: Arc::new(AppState {
                config,
                dispatcher: Dispatcher::new(client, policy),
                catalog: default_catalog(),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(home))
            .route("/health", get(health))
            .route("/v1/models", get(list_models))
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }
}

/// Static catalog served by `GET /v1/models`; never changes at runtime.
fn default_catalog() -> Vec<Model> {
    vec![
        Model::new("meta/llama-3.1-405b-instruct", "meta"),
        Model::new("meta/llama-3.1-70b-instruct", "meta"),
        Model::new("mistralai/mixtral-8x7b-instruct-v0.1", "mistralai"),
    ]
}
