use crate::api::{routes, AppState};
use std::net::SocketAddr;
use tracing::info;

/// Starts and runs the HTTP server using Axum web framework
///
/// # Arguments
/// * `state` - Shared engine, rate limiter and limits
/// * `host` - Interface to bind, e.g. `0.0.0.0`
/// * `port` - Port number to listen on for incoming HTTP connections
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Ok once the server stops, Error if it cannot bind or serve
pub async fn launch_server(
    state: AppState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = routes::app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
