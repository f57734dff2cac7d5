//! Server module
//!
//! Handles TCP connections and manages the accept loop.
//! This module is responsible for accepting connections and delegating
//! command processing to the dispatcher.

mod connection;

use crate::dispatch::Dispatcher;
use crate::service::KvService;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

pub use connection::Connection;

/// RESP server bound to its listening socket
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Bind the listener; `addr` may use port 0 to pick a free port
    pub async fn bind(addr: &str, service: KvService) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RESP listener on {}", addr))?;

        Ok(Server {
            listener,
            dispatcher: Arc::new(Dispatcher::new(service)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server
    ///
    /// Accepts connections until `shutdown` is cancelled, then waits for every
    /// connection task to finish, so no request is still running when this returns.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!("snapkv RESP server listening on {}", addr);

        let tracker = TaskTracker::new();

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    // Usually a transient resource error (EMFILE...), keep accepting
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            info!("New RESP connection from {}", peer);

            let dispatcher = self.dispatcher.clone();
            let shutdown = shutdown.clone();

            tracker.spawn(async move {
                let mut connection = Connection::new(socket);

                if let Err(e) = connection.handle(&dispatcher, &shutdown).await {
                    error!("Connection error from {}: {}", peer, e);
                }

                info!("Connection closed: {}", peer);
            });
        }

        tracker.close();
        info!("RESP server stopped accepting, waiting for {} connection(s)", tracker.len());
        tracker.wait().await;

        Ok(())
    }
}
