use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use http::StatusCode;
use tracing::{info, warn};

use nimproxy_protocol::ListModelsResponse;

use crate::classify::classify_request;
use crate::core::AppState;
use crate::error::ProxyError;
use crate::relay;
use crate::transform::to_upstream;
use crate::upstream_client::{UpstreamBody, dispatch::UpstreamOutcome};

pub async fn home(State(state): State<Arc<AppState>>) -> Response {
    let body = serde_json::json!({
        "status": "running",
        "message": "NVIDIA NIM Proxy API",
        "api_key_configured": state.config.api_key_configured(),
    });
    relay::json_response(StatusCode::OK, Bytes::from(body.to_string()))
}

pub async fn health() -> Response {
    relay::json_response(StatusCode::OK, Bytes::from_static(b"{\"status\":\"healthy\"}"))
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Response {
    let body = ListModelsResponse::new(state.catalog.clone());
    match serde_json::to_vec(&body) {
        Ok(bytes) => relay::json_response(StatusCode::OK, Bytes::from(bytes)),
        Err(err) => relay::error_response(&ProxyError::server(format!(
            "failed to encode model list: {err}"
        ))),
    }
}

/// POST /v1/chat/completions. Outer wrapper is the terminal fallback: every
/// failure of the inner pipeline renders as a structured JSON error.
pub async fn chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let started_at = Instant::now();
    match chat_completions_inner(&state, body).await {
        Ok(response) => {
            info!(
                event = "chat_responded",
                status = response.status().as_u16(),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
            );
            response
        }
        Err(err) => {
            warn!(
                event = "chat_failed",
                kind = %err.kind,
                status = err.status.as_u16(),
                message = %err.message,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
            );
            relay::error_response(&err)
        }
    }
}

async fn chat_completions_inner(state: &AppState, body: Bytes) -> Result<Response, ProxyError> {
    // Credential presence is checked before validation.
    let Some(api_key) = state.config.api_key() else {
        return Err(ProxyError::configuration("NVIDIA_API_KEY not configured"));
    };

    let classified = classify_request(&body)?;
    let payload = to_upstream(&classified.body, &state.config.default_model);
    info!(
        event = "chat_received",
        model = %payload.model,
        is_stream = classified.is_stream,
    );

    let outcome = state
        .dispatcher
        .dispatch(&payload, &state.config.base_url, api_key)
        .await;
    let response = match outcome {
        UpstreamOutcome::Success(response) => response,
        UpstreamOutcome::Failed(err) => return Err(err),
    };

    match response.body {
        UpstreamBody::Stream(stream) => Ok(relay::stream_response(stream)),
        UpstreamBody::Bytes(bytes) => Ok(relay::json_response(StatusCode::OK, bytes)),
    }
}
