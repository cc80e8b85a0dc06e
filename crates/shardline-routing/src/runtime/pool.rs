//! Per-node connection pool.
//!
//! Connections are opened on first checkout and cached afterwards. A
//! checkout holds a semaphore permit for its whole lifetime, so the pool
//! never exceeds `max_connections` and every exit path (success, error,
//! panic) gives the slot back.

use crate::config::PoolConfig;
use crate::domain::{ConnectionError, NodeDescriptor, ShardId, ShardingError, ShardingResult};
use crate::ports::{Connection, Connector};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Lazily connecting pool for one physical node.
pub struct NodePool {
    shard: ShardId,
    node: NodeDescriptor,
    connector: Arc<dyn Connector>,
    config: PoolConfig,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    permits: Arc<Semaphore>,
    open: AtomicUsize,
}

impl NodePool {
    /// Create an empty pool. Opens nothing.
    pub fn new(
        shard: ShardId,
        node: NodeDescriptor,
        connector: Arc<dyn Connector>,
        config: PoolConfig,
    ) -> Self {
        let slots = config.max_connections.max(1);
        Self {
            shard,
            node,
            connector,
            config,
            idle: Mutex::new(Vec::new()),
            permits: Arc::new(Semaphore::new(slots)),
            open: AtomicUsize::new(0),
        }
    }

    /// Node this pool connects to.
    pub fn node(&self) -> &NodeDescriptor {
        &self.node
    }

    /// Live connections, idle plus checked out.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Connections waiting in the pool.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().len()
    }

    /// Whether [`NodePool::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Check out a connection, opening one if no healthy idle connection
    /// exists.
    ///
    /// # Errors
    ///
    /// [`ShardingError::Connection`] with `Timeout` when no slot frees up or
    /// the connect exceeds its budget, `Closed` after [`NodePool::close`],
    /// or whatever the connector reported.
    pub async fn checkout(self: &Arc<Self>) -> ShardingResult<PooledConnection> {
        let permit = timeout(
            self.config.acquire_timeout(),
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| self.error(ConnectionError::Timeout(self.config.acquire_timeout_ms)))?
        .map_err(|_| self.error(ConnectionError::Closed))?;

        let conn = match self.take_idle() {
            Some(conn) => conn,
            None => self.open_connection().await?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Drop idle connections and refuse further checkouts. Checked-out
    /// connections are dropped when returned.
    pub fn close(&self) {
        self.permits.close();
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        self.open.fetch_sub(drained.len(), Ordering::SeqCst);
        if !drained.is_empty() {
            info!(
                shard = %self.shard,
                node = %self.node.dsn,
                released = drained.len(),
                "Released idle connections"
            );
        }
    }

    fn take_idle(&self) -> Option<Box<dyn Connection>> {
        let mut idle = self.idle.lock();
        while let Some(conn) = idle.pop() {
            if conn.is_healthy() {
                return Some(conn);
            }
            self.open.fetch_sub(1, Ordering::SeqCst);
            debug!(shard = %self.shard, node = %self.node.dsn, "Dropped unhealthy idle connection");
        }
        None
    }

    async fn open_connection(&self) -> ShardingResult<Box<dyn Connection>> {
        let conn = timeout(self.config.connect_timeout(), self.connector.connect(&self.node))
            .await
            .map_err(|_| self.error(ConnectionError::Timeout(self.config.connect_timeout_ms)))?
            .map_err(|e| self.error(e))?;

        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            shard = %self.shard,
            node = %self.node.dsn,
            role = %self.node.role,
            open,
            "Opened connection"
        );
        Ok(conn)
    }

    fn give_back(&self, conn: Box<dyn Connection>) {
        // Checked under the idle lock: `close` closes the permits before it
        // drains, so a closed pool never receives a connection back.
        let mut idle = self.idle.lock();
        if self.permits.is_closed() || !conn.is_healthy() {
            self.open.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        idle.push(conn);
    }

    fn forget(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    fn error(&self, source: ConnectionError) -> ShardingError {
        warn!(shard = %self.shard, node = %self.node.dsn, error = %source, "Connection failure");
        ShardingError::Connection {
            shard: self.shard.clone(),
            node: self.node.dsn.clone(),
            source,
        }
    }
}

/// A checked-out connection. Returns to its pool on drop.
pub struct PooledConnection {
    conn: Option<Box<dyn Connection>>,
    pool: Arc<NodePool>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Node this connection points at.
    pub fn node(&self) -> &NodeDescriptor {
        self.pool.node()
    }

    /// Close this connection instead of returning it to the pool.
    pub fn discard(mut self) {
        if self.conn.take().is_some() {
            self.pool.forget();
        }
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_deref().expect("connection is present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_deref_mut().expect("connection is present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.give_back(conn);
        }
    }
}
