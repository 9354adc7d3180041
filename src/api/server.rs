//! HTTP server lifecycle.

use crate::api::{api_routes, AppState};
use crate::error::AppError;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

/// Handle to a running server.
pub struct ServerHandle {
    cancel_token: CancellationToken,
    addr: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// The address the server actually bound (useful with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        let _ = self.task.await;
    }
}

/// Bind and start the API server.
///
/// The server runs on a background task; cancel the returned handle to shut
/// it down gracefully.
pub async fn start_server(state: AppState, port: u16) -> Result<ServerHandle, AppError> {
    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    let app = api_routes()
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to port {}: {}", port, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| AppError::internal(format!("Failed to read bound address: {}", e)))?;

    log::info!("API server listening on http://{}", addr);

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            cancel_clone.cancelled().await;
        });

        if let Err(e) = server.await {
            log::error!("Server error: {}", e);
        }

        log::info!("Server stopped");
    });

    Ok(ServerHandle {
        cancel_token,
        addr,
        task,
    })
}
