//! MCP server builder.
//!
//! Serves an `rmcp` [`ServerHandler`] over the selected [`Transport`] until the
//! client goes away, the process receives Ctrl+C/SIGTERM, or an explicit
//! shutdown channel fires.
//!
//! ```ignore
//! use nanobanana_mcp_common::{McpServerBuilder, Transport};
//!
//! McpServerBuilder::new(server)
//!     .with_transport(Transport::Http { port: 8080 })
//!     .run()
//!     .await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;

use rmcp::{ServerHandler, ServiceExt};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::transport::Transport;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The HTTP listener could not be bound
    #[error("Failed to bind to port {port}: {message}")]
    BindFailed { port: u16, message: String },

    /// The transport failed while serving
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    fn transport(err: impl std::fmt::Display) -> Self {
        ServerError::Transport(err.to_string())
    }
}

/// Builder for running an MCP server.
pub struct McpServerBuilder<H> {
    handler: H,
    transport: Transport,
    shutdown: Option<oneshot::Receiver<()>>,
}

impl<H> McpServerBuilder<H>
where
    H: ServerHandler + Clone + Send + Sync + 'static,
{
    /// Serve `handler` over stdio unless told otherwise.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            transport: Transport::default(),
            shutdown: None,
        }
    }

    /// Select the transport.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Stop when `shutdown` fires (or its sender is dropped) instead of on
    /// process signals.
    pub fn with_shutdown(mut self, shutdown: oneshot::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Serve until the client disconnects or shutdown is requested.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self {
            handler,
            transport,
            shutdown,
        } = self;
        info!(transport = %transport, "Starting MCP server");

        let stop = wait_for_stop(shutdown);
        match transport {
            Transport::Stdio => serve_stdio(handler, stop).await,
            Transport::Http { port } => serve_http(handler, port, stop).await,
        }
    }
}

async fn serve_stdio<H, F>(handler: H, stop: F) -> Result<(), ServerError>
where
    H: ServerHandler + Clone + Send + Sync + 'static,
    F: Future<Output = ()>,
{
    let running = handler
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(ServerError::transport)?;

    tokio::select! {
        quit = running.waiting() => {
            quit.map_err(ServerError::transport)?;
            info!("MCP client disconnected");
        }
        () = stop => info!("Stopping stdio server"),
    }
    Ok(())
}

async fn serve_http<H, F>(handler: H, port: u16, stop: F) -> Result<(), ServerError>
where
    H: ServerHandler + Clone + Send + Sync + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };

    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let app = axum::Router::new().nest_service("/mcp", service);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindFailed {
            port,
            message: e.to_string(),
        })?;
    info!(%addr, "Serving MCP over streamable HTTP at /mcp");

    axum::serve(listener, app)
        .with_graceful_shutdown(stop)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn wait_for_stop(shutdown: Option<oneshot::Receiver<()>>) {
    match shutdown {
        // A dropped sender also means stop
        Some(rx) => {
            let _ = rx.await;
        }
        None => shutdown_signal().await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

/// Channel for stopping a server programmatically; pass the receiver to
/// [`McpServerBuilder::with_shutdown`].
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}
