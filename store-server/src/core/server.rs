//! HTTP server startup and shutdown

use crate::api;
use crate::core::ServerState;
use anyhow::Context;

/// HTTP server
pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// Bind and serve until ctrl-c
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = api::build_app(self.state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        tracing::info!(
            %addr,
            environment = %self.state.config.environment,
            "Store server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
            })
            .await
            .context("HTTP server failed")?;

        Ok(())
    }
}
