use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

mod cli;

use nimproxy_core::{Core, GlobalConfig, RetryPolicy, UpstreamClientConfig, WreqUpstreamClient};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("nimproxy failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = GlobalConfig {
        host: cli.host,
        port: cli.port,
        api_key: cli.api_key,
        base_url: cli.base_url,
        default_model: cli.default_model,
    };
    if !config.api_key_configured() {
        warn!("NVIDIA_API_KEY not configured; chat requests will be rejected");
    }
    info!(
        host = %config.host,
        port = config.port,
        base_url = %config.base_url,
        default_model = %config.default_model,
        api_key_configured = config.api_key_configured(),
        "config loaded"
    );

    let client = WreqUpstreamClient::new(UpstreamClientConfig::default())?;
    let bind = format!("{}:{}", config.host, config.port);
    let core = Core::new(config, Arc::new(client), RetryPolicy::default());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, core.router()).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("nimproxy=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
