//! Service adapter
//!
//! Binds the remote operations to a KvStore and owns the snapshot lifecycle:
//! `open` loads the snapshot before anything is served, `persist` writes it
//! back at shutdown. Transports (RESP, HTTP) only ever talk to this type.

use crate::config::ServerConfig;
use crate::rpc::{GetRequest, GetResponse, Request, Response, RpcError, SetRequest, SetResponse};
use crate::store::{KvStore, SnapshotError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

/// Cheaply cloneable handle shared by every connection
#[derive(Clone)]
pub struct KvService {
    store: Arc<KvStore>,
    snapshot: Option<PathBuf>,
    request_timeout: Duration,
}

impl KvService {
    /// Wrap an existing store, without persistence
    pub fn new(store: Arc<KvStore>, request_timeout: Duration) -> Self {
        KvService {
            store,
            snapshot: None,
            request_timeout,
        }
    }

    /// Save to `path` on `persist`
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Build the service for `config` and load its snapshot
    ///
    /// A missing snapshot file starts an empty store. Any other load failure
    /// is returned and the caller must not start serving.
    pub async fn open(config: &ServerConfig) -> Result<Self, SnapshotError> {
        let mut service = Self::new(Arc::new(KvStore::new()), config.request_timeout());

        match config.snapshot_path() {
            Some(path) => {
                service.store.load_snapshot(path).await?;
                service = service.with_snapshot(path);
            }
            None => info!("Persistence disabled, starting with an empty store"),
        }

        Ok(service)
    }

    /// Save the snapshot, if persistence is enabled
    ///
    /// Returns the number of entries written, `None` when there is no snapshot path.
    pub async fn persist(&self) -> Result<Option<usize>, SnapshotError> {
        match &self.snapshot {
            Some(path) => self.store.save_snapshot(path).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Serve one request within the request deadline
    pub async fn handle(&self, request: Request) -> Result<Response, RpcError> {
        match request {
            Request::Get(req) => self.get(req).await.map(Response::Get),
            Request::Set(req) => self.set(req).await.map(Response::Set),
            Request::Ping => Ok(Response::Pong),
        }
    }

    /// Get operation
    pub async fn get(&self, req: GetRequest) -> Result<GetResponse, RpcError> {
        self.with_deadline("GET", async {
            GetResponse::from(self.store.get(&req.key).await)
        })
        .await
    }

    /// Set operation; always succeeds unless the deadline elapses first
    pub async fn set(&self, req: SetRequest) -> Result<SetResponse, RpcError> {
        self.with_deadline("SET", async {
            self.store.set(req.key, req.value).await;
            SetResponse { success: true }
        })
        .await
    }

    /// Run a store operation under the request deadline
    ///
    /// Store operations only await while queued for the lock, so an expired
    /// deadline drops the request before it touches the mapping and never
    /// interrupts one that was already granted the lock.
    async fn with_deadline<T>(
        &self,
        op: &'static str,
        operation: impl Future<Output = T>,
    ) -> Result<T, RpcError> {
        match time::timeout(self.request_timeout, operation).await {
            Ok(output) => Ok(output),
            Err(_) => {
                warn!("{} abandoned after waiting {:?} for the store", op, self.request_timeout);
                Err(RpcError::DeadlineExceeded)
            }
        }
    }
}
