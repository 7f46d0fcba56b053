use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;

use nimproxy_core::upstream_client::{
    UpstreamBody, UpstreamClient, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportError,
};
use nimproxy_core::{Core, GlobalConfig, RetryPolicy, handler};
use nimproxy_protocol::{ErrorBody, ListModelsResponse};

/// Hands out at most one scripted response and counts upstream calls.
struct OneShotClient {
    response: Mutex<Option<UpstreamHttpResponse>>,
    calls: AtomicU32,
}

impl OneShotClient {
    fn with(response: UpstreamHttpResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(response)),
            calls: AtomicU32::new(0),
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(None),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UpstreamClient for OneShotClient {
    fn send<'a>(
        &'a self,
        _req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamTransportError>> + Send + 'a>>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .response
            .lock()
            .unwrap()
            .take()
            .expect("unexpected upstream call");
        Box::pin(async move { Ok(response) })
    }
}

fn config() -> GlobalConfig {
    GlobalConfig {
        api_key: Some("test-key".to_string()),
        ..GlobalConfig::default()
    }
}

fn core_with(config: GlobalConfig, client: Arc<OneShotClient>) -> Core {
    Core::new(config, client, RetryPolicy::default())
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

fn error_type(body: &Bytes) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap();
    parsed.error.kind
}

#[tokio::test]
async fn missing_messages_yields_400_and_no_upstream_call() {
    let client = OneShotClient::unreachable();
    let core = core_with(config(), client.clone());

    let response = handler::chat_completions(
        State(core.state()),
        Bytes::from_static(b"{\"model\":\"meta/llama-3.1-70b-instruct\"}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_type(&body_bytes(response).await), "invalid_request_error");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn missing_credential_yields_500_for_any_request_shape() {
    let client = OneShotClient::unreachable();
    let core = core_with(GlobalConfig::default(), client.clone());

    // Even a well-formed request is rejected before validation.
    let response = handler::chat_completions(
        State(core.state()),
        Bytes::from_static(b"{\"messages\":[{\"role\":\"user\",\"content\":\"hi\"}]}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&body_bytes(response).await), "configuration_error");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn buffered_success_is_forwarded_verbatim() {
    let upstream_body = b"{\"id\":\"cmpl-1\",\"choices\":[]}";
    let client = OneShotClient::with(UpstreamHttpResponse {
        status: 200,
        headers: Vec::new(),
        body: UpstreamBody::Bytes(Bytes::from_static(upstream_body)),
    });
    let core = core_with(config(), client.clone());

    let response = handler::chat_completions(
        State(core.state()),
        Bytes::from_static(b"{\"messages\":[{\"role\":\"user\",\"content\":\"hi\"}]}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_bytes(response).await, Bytes::from_static(upstream_body));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn streaming_success_relays_every_line_in_order() {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, String>>(16);
    tokio::spawn(async move {
        // Chunk boundaries deliberately misaligned with line boundaries.
        let chunks: &[&[u8]] = &[
            b"data: {\"n\":1}\ndata: {\"n\"",
            b":2}\n",
            b"data: {\"n\":3}\n",
        ];
        for chunk in chunks {
            tx.send(Ok(Bytes::from_static(chunk))).await.unwrap();
        }
    });
    let client = OneShotClient::with(UpstreamHttpResponse {
        status: 200,
        headers: Vec::new(),
        body: UpstreamBody::Stream(rx),
    });
    let core = core_with(config(), client);

    let response = handler::chat_completions(
        State(core.state()),
        Bytes::from_static(
            b"{\"messages\":[{\"role\":\"user\",\"content\":\"hi\"}],\"stream\":true}",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    let body = body_bytes(response).await;
    assert_eq!(
        body,
        Bytes::from_static(b"data: {\"n\":1}\ndata: {\"n\":2}\ndata: {\"n\":3}\n")
    );
}

#[tokio::test]
async fn models_catalog_is_static() {
    let core = core_with(config(), OneShotClient::unreachable());

    let first = body_bytes(handler::list_models(State(core.state())).await).await;
    let second = body_bytes(handler::list_models(State(core.state())).await).await;
    assert_eq!(first, second);

    let parsed: ListModelsResponse = serde_json::from_slice(&first).unwrap();
    assert_eq!(parsed.data.len(), 3);
    assert_eq!(parsed.data[0].id, "meta/llama-3.1-405b-instruct");
    assert_eq!(parsed.data[0].owned_by, "meta");
}

#[tokio::test]
async fn health_and_home_report_status() {
    let core = core_with(config(), OneShotClient::unreachable());

    let response = handler::health().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_bytes(response).await,
        Bytes::from_static(b"{\"status\":\"healthy\"}")
    );

    let response = handler::home(State(core.state())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(parsed["status"], "running");
    assert_eq!(parsed["api_key_configured"], true);

    let core = core_with(GlobalConfig::default(), OneShotClient::unreachable());
    let response = handler::home(State(core.state())).await;
    let parsed: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(parsed["api_key_configured"], false);
}
