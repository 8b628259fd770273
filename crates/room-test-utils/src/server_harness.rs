//! Test server harness for E2E testing.
//!
//! Provides `TestRoomServer` for spawning real room service instances
//! against an injected storage backend (usually `MemoryStorage`).

use metrics_exporter_prometheus::PrometheusBuilder;
use room_service::config::{ClaimPolicy, Config};
use room_service::routes::{build_routes, AppState};
use room_service::storage::Storage;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration suitable for a test instance. The database URL is a
/// placeholder: tests inject their own storage backend, so no connection
/// is ever opened.
pub fn test_config(claim_policy: ClaimPolicy) -> Config {
    Config {
        database_url: "postgresql://localhost/unused-in-tests".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        storage_timeout: Duration::from_millis(2500),
        db_max_connections: 1,
        claim_policy,
    }
}

/// Test harness for spawning the room service in E2E tests.
///
/// The server binds an ephemeral port and runs on a background task that
/// is aborted on drop.
pub struct TestRoomServer {
    addr: SocketAddr,
    server_handle: JoinHandle<()>,
}

impl TestRoomServer {
    /// Spawn a server with the default (exclusive) claim policy.
    pub async fn spawn(storage: Arc<dyn Storage>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_policy(storage, ClaimPolicy::Exclusive).await
    }

    /// Spawn a server with an explicit claim policy.
    pub async fn spawn_with_policy(
        storage: Arc<dyn Storage>,
        claim_policy: ClaimPolicy,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(storage, test_config(claim_policy)));

        // Per-instance recorder; the global recorder cannot be installed
        // more than once per process
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            server_handle,
        })
    }

    /// Base URL of the running server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestRoomServer {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}
