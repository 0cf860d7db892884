//! Test server harness.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use hilite::gateway::{GatewayState, create_router_with_state};
use hilite::oracle::ScriptedOracle;
use hilite::pipeline::{HighlightPipeline, RetryPolicy};
use hilite::store::MemoryQueryStore;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub struct TestServer {
    pub addr: SocketAddr,
    pub oracle: Arc<ScriptedOracle>,
    pub store: Arc<MemoryQueryStore>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Spawns a server over an in-memory store and a scripted oracle, bound
/// to an ephemeral local port.
pub async fn spawn_test_server(oracle: ScriptedOracle) -> Result<TestServer, ServerStartupError> {
    spawn_server_with_retry(oracle, RetryPolicy::default()).await
}

pub async fn spawn_server_with_retry(
    oracle: ScriptedOracle,
    retry: RetryPolicy,
) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let local_addr = listener.local_addr()?;

    let oracle = Arc::new(oracle);
    let store = Arc::new(MemoryQueryStore::new());
    let pipeline = HighlightPipeline::with_retry(Arc::clone(&oracle), Arc::clone(&store), retry);
    let state = GatewayState::new(pipeline, Arc::clone(&store));
    let app = create_router_with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        oracle,
        store,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
