use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::api::{api_router, ApiState};

pub struct WebServerConfig {
    pub port: u16,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

/// Serve the admin API until `shutdown` resolves.
pub async fn start_web_server(
    config: WebServerConfig,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = api_router(state).layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind admin API on {}: {}", addr, e))?;

    info!("Admin API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Admin API stopped");

    Ok(())
}
