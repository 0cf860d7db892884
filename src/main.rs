//! Hilite HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use hilite::config::Config;
use hilite::gateway::{GatewayState, create_router_with_state};
use hilite::oracle::{GeminiOracle, GeminiOracleConfig};
use hilite::pipeline::{HighlightPipeline, RetryPolicy};
use hilite::store::FsQueryStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        r#"
██╗  ██╗██╗██╗     ██╗████████╗███████╗
██║  ██║██║██║     ██║╚══██╔══╝██╔════╝
███████║██║██║     ██║   ██║   █████╗
██╔══██║██║██║     ██║   ██║   ██╔══╝
██║  ██║██║███████╗██║   ██║   ███████╗
╚═╝  ╚═╝╚═╝╚══════╝╚═╝   ╚═╝   ╚══════╝

        ASK. SCORE. SHARE.
                                AGPL-3.0
"#
    );

    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        data_dir = %config.data_dir.display(),
        "Hilite starting"
    );

    if config.gemini_api_key.is_none() {
        tracing::warn!("No GEMINI_API_KEY configured, requests must carry their own key");
    }

    let store = Arc::new(FsQueryStore::with_read_cache_capacity(
        config.data_dir.join("queries"),
        config.read_cache_capacity,
    ));
    store.ensure_root()?;

    let oracle = Arc::new(GeminiOracle::new(GeminiOracleConfig {
        base_url: config.oracle_base_url.clone(),
        model: config.oracle_model.clone(),
        api_key: config.gemini_api_key.clone(),
        request_timeout: config.oracle_timeout(),
    })?);

    let retry = RetryPolicy {
        max_attempts: config.oracle_attempts,
        ..RetryPolicy::default()
    };
    let pipeline = HighlightPipeline::with_retry(Arc::clone(&oracle), Arc::clone(&store), retry);
    let state = GatewayState::new(pipeline, store);

    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Hilite shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("HILITE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/api/health", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
