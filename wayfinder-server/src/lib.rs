//! wayfinder-server: HTTP and WebSocket front end for the navigation assistant

pub mod http;
pub mod live;
pub mod state;
pub mod static_files;
pub mod websocket;

pub use http::{create_router, ApiJson, DetectResponse, ErrorResponse};
pub use state::{AppState, Exchange, LatestDetection};

use tokio::net::TcpListener;
use tracing::info;

/// Bind and serve until Ctrl+C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Wayfinder listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
