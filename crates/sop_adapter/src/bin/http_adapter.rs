#![forbid(unsafe_code)]

use sop_adapter::http::build_router;
use sop_adapter::{AdapterConfig, AdapterRuntime};
use sop_engines::sopgen::SopGenProviderConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AdapterConfig::from_env()?;
    init_tracing(config.log_json);

    let runtime = AdapterRuntime::from_config(&config, SopGenProviderConfig::from_env())?;
    let ai_mode = runtime.ai_mode();
    let app = build_router(runtime);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        ai_mode = ai_mode.as_str(),
        seeded = config.seed_store,
        "sop_adapter_http listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
