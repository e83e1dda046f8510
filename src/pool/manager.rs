use std::sync::Arc;

use deadpool::managed::{Manager, Metrics, RecycleError, RecycleResult};

use crate::connection::Connection;
use crate::driver::Transport;
use crate::error::SqlBridgeError;
use crate::mssql::{MssqlConnection, MssqlOptions};
use crate::results::Fetch;

/// deadpool manager that opens [`MssqlConnection`]s.
#[derive(Debug, Clone)]
pub struct MssqlManager {
    options: MssqlOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl MssqlManager {
    #[must_use]
    pub fn new(options: MssqlOptions) -> Self {
        Self {
            options,
            transport: None,
        }
    }

    #[must_use]
    pub fn with_transport(options: MssqlOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            options,
            transport: Some(transport),
        }
    }

    fn connection(&self) -> MssqlConnection {
        match &self.transport {
            Some(transport) => {
                MssqlConnection::with_transport(self.options.clone(), Arc::clone(transport))
            }
            None => MssqlConnection::new(self.options.clone()),
        }
    }
}

impl Manager for MssqlManager {
    type Type = MssqlConnection;
    type Error = SqlBridgeError;

    async fn create(&self) -> Result<MssqlConnection, SqlBridgeError> {
        let mut conn = self.connection();
        conn.make_connection().await?;
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut MssqlConnection,
        _metrics: &Metrics,
    ) -> RecycleResult<SqlBridgeError> {
        let level = conn.get_transaction_level();
        if level > 0 {
            tracing::warn!(level, "discarding pooled connection returned inside a transaction");
            return Err(RecycleError::Message(
                "connection returned to the pool inside a transaction".into(),
            ));
        }
        if conn.is_closed() {
            conn.make_connection().await.map_err(RecycleError::Backend)?;
            return Ok(());
        }
        // A dead link still looks open; only a round trip tells.
        if let Err(err) = conn.query("SELECT 1", &[], Fetch::One).await {
            tracing::warn!(error = %err, "discarding pooled connection that failed its health check");
            return Err(RecycleError::Backend(err));
        }
        Ok(())
    }
}
