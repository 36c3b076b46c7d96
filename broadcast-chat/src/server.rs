use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Result;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{info, warn};

use crate::{registry::ConnectionRegistry, session::handle_connection};

/// Accepts WebSocket clients and gives each one its own session task. All
/// sessions share one [`ConnectionRegistry`], which the operator loop also
/// broadcasts through.
pub struct Server {
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
}

impl Server {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the live connections, for the operator loop.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Accepts connections until `shutdown` resolves. Sessions already running
    /// are left to finish on their own; accept errors are logged and skipped.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, registry } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &registry);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    registry: &Arc<ConnectionRegistry>,
) {
    match result {
        Ok((stream, peer)) => spawn_client_handler(stream, peer, registry),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_client_handler(stream: TcpStream, peer: SocketAddr, registry: &Arc<ConnectionRegistry>) {
    let registry = Arc::clone(registry);
    tokio::spawn(async move {
        if let Err(err) = handle_connection(stream, Some(peer), registry).await {
            warn!(peer = %peer, error = ?err, "client connection closed with error");
        }
    });
}
