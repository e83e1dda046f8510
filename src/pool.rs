//! Explicit connection pool.
//!
//! Connections are leased from a [`ConnectionPool`] that the caller owns and
//! passes around; there is no process-wide pool. A lease derefs to
//! [`MssqlConnection`] and goes back to the pool when dropped. Connections
//! stay open between leases; nothing closes them after a query.

pub mod manager;

use std::sync::Arc;

use deadpool::managed::{Object, Pool};

use crate::driver::Transport;
use crate::error::SqlBridgeError;
use crate::mssql::MssqlOptions;

pub use manager::MssqlManager;

/// A connection leased from a [`ConnectionPool`].
pub type PooledConnection = Object<MssqlManager>;

/// Default upper bound on pooled connections.
pub const DEFAULT_MAX_SIZE: usize = 20;

/// Configuration and connection pool for SQL Server.
#[derive(Clone)]
pub struct ConfigAndPool {
    pool: Pool<MssqlManager>,
}

/// Shorter name for the pool handle.
pub type ConnectionPool = ConfigAndPool;

impl std::fmt::Debug for ConfigAndPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("ConfigAndPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .field("max_size", &status.max_size)
            .finish()
    }
}

impl ConfigAndPool {
    /// Pool over the default transport.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::PoolError` if the pool cannot be built.
    pub fn new_mssql(options: MssqlOptions, max_size: usize) -> Result<Self, SqlBridgeError> {
        Self::build(MssqlManager::new(options), max_size)
    }

    /// Pool over a caller-supplied transport.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::PoolError` if the pool cannot be built.
    pub fn with_transport(
        options: MssqlOptions,
        transport: Arc<dyn Transport>,
        max_size: usize,
    ) -> Result<Self, SqlBridgeError> {
        Self::build(MssqlManager::with_transport(options, transport), max_size)
    }

    fn build(manager: MssqlManager, max_size: usize) -> Result<Self, SqlBridgeError> {
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| {
                SqlBridgeError::PoolError(format!("Failed to create SQL Server pool: {e}"))
            })?;
        Ok(Self { pool })
    }

    /// Lease a connection, opening a new one if none is idle.
    ///
    /// # Errors
    /// Connection failures are returned as the connection reported them.
    pub async fn get_connection(&self) -> Result<PooledConnection, SqlBridgeError> {
        Ok(self.pool.get().await?)
    }

    #[must_use]
    pub fn status(&self) -> deadpool::Status {
        self.pool.status()
    }

    /// Stop handing out connections and drop the idle ones.
    pub fn close(&self) {
        self.pool.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
