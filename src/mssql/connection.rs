use std::sync::Arc;

use async_trait::async_trait;

use super::config::{DEFAULT_PORT, MssqlOptions};
use crate::connection::{Connection, GrammarBinding, PlatformBinding};
use crate::driver::{CursorSnapshot, DriverHandle, Transport};
use crate::error::SqlBridgeError;
use crate::results::{CustomDbRow, Fetch, QueryOutput};
use crate::results::row::build_index;
use crate::translation::{PlaceholderStyle, normalize_placeholders};
use crate::types::{DatabaseType, RowValues};

const MISSING_DRIVER_HINT: &str = "You must have the `mssql` feature of sql-bridge enabled to make a connection to Microsoft SQL Server. \
Please enable it in Cargo.toml: sql-bridge = { version = \"0.1\", features = [\"mssql\"] }, \
or supply a transport with MssqlConnection::with_transport";

const MSSQL_GRAMMAR: GrammarBinding = GrammarBinding {
    name: "mssql",
    database_type: DatabaseType::Mssql,
    placeholder_style: PlaceholderStyle::Qmark,
    identifier_quotes: ('[', ']'),
    supports_returning: false,
    offset_fetch_pagination: true,
};

const MSSQL_PLATFORM: PlatformBinding = PlatformBinding {
    name: "mssql",
    database_type: DatabaseType::Mssql,
    default_port: DEFAULT_PORT,
    default_schema: "dbo",
    supports_schemas: true,
    transactional_ddl: true,
    identity_keyword: "IDENTITY(1,1)",
};

/// A connection to Microsoft SQL Server.
///
/// Construction does no I/O. The driver handle is opened by
/// [`make_connection`](Connection::make_connection), or lazily by the first
/// `query`/`begin` while the connection is closed, and then reused until
/// [`close`](Connection::close).
///
/// Transactions nest flat: only the outermost `begin`/`commit` pair reaches
/// the server, inner pairs move the counter.
pub struct MssqlConnection {
    options: MssqlOptions,
    transport: Option<Arc<dyn Transport>>,
    handle: Option<Box<dyn DriverHandle>>,
    cursor: Option<CursorSnapshot>,
    transaction_level: usize,
    dry: bool,
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("host", &self.options.host)
            .field("port", &self.options.port)
            .field("database", &self.options.database)
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .field("closed", &self.is_closed())
            .field("transaction_level", &self.transaction_level)
            .field("dry", &self.dry)
            .finish_non_exhaustive()
    }
}

impl MssqlConnection {
    /// Build a connection that will use the tiberius transport when the `mssql` feature is on.
    #[must_use]
    pub fn new(options: MssqlOptions) -> Self {
        Self {
            options,
            transport: default_transport(),
            handle: None,
            cursor: None,
            transaction_level: 0,
            dry: false,
        }
    }

    /// Build a connection over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(options: MssqlOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
            ..Self::new(options)
        }
    }

    #[must_use]
    pub fn options(&self) -> &MssqlOptions {
        &self.options
    }

    /// Table prefix configured for this connection. Applied by callers, not here.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.options.prefix.as_deref()
    }

    /// In dry-run mode statement batches are skipped instead of executed.
    pub fn set_dry(&mut self, dry: bool) {
        self.dry = dry;
    }

    #[must_use]
    pub fn is_dry(&self) -> bool {
        self.dry
    }

    async fn open_handle(&mut self) -> Result<(), SqlBridgeError> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| SqlBridgeError::DriverUnavailable(MISSING_DRIVER_HINT.to_string()))?;

        tracing::debug!(
            transport = transport.name(),
            host = ?self.options.host,
            port = self.options.effective_port(),
            database = ?self.options.database,
            "making connection"
        );

        let handle = transport.connect(&self.options, true).await?;
        self.handle = Some(handle);
        self.cursor = None;
        Ok(())
    }

    async fn ensure_open(&mut self) -> Result<&mut (dyn DriverHandle + 'static), SqlBridgeError> {
        if self.handle.is_none() {
            self.open_handle().await?;
        }
        self.handle
            .as_deref_mut()
            .ok_or_else(|| SqlBridgeError::ConnectionError("connection is closed".to_string()))
    }

    fn open_handle_mut(&mut self) -> Result<&mut (dyn DriverHandle + 'static), SqlBridgeError> {
        self.handle.as_deref_mut().ok_or_else(|| {
            SqlBridgeError::ConnectionError(
                "connection was closed while a transaction was open".to_string(),
            )
        })
    }

    /// Run one statement through a fresh cursor. With `fetch == None` no rows are read.
    async fn run_statement(
        &mut self,
        statement: &str,
        bindings: &[RowValues],
        fetch: Option<Fetch>,
    ) -> Result<QueryOutput, SqlBridgeError> {
        self.cursor = None;
        let handle = self.ensure_open().await?;
        let mut cursor = handle.cursor();
        cursor.execute(statement, bindings).await?;

        let description = cursor.description().map(<[_]>::to_vec);
        let names = Arc::new(
            description
                .iter()
                .flatten()
                .map(|col| col.name.clone())
                .collect::<Vec<_>>(),
        );

        let output = match (fetch, description.is_some()) {
            (Some(Fetch::One), true) => match cursor.fetch_one().await? {
                Some(values) => QueryOutput::Row(CustomDbRow::new(names, values)),
                None => QueryOutput::Row(CustomDbRow::empty()),
            },
            (Some(Fetch::One) | None, _) => QueryOutput::Row(CustomDbRow::empty()),
            (Some(Fetch::All), true) => {
                let index = Arc::new(build_index(&names));
                let rows = cursor
                    .fetch_all()
                    .await?
                    .into_iter()
                    .map(|values| CustomDbRow::with_index(names.clone(), index.clone(), values))
                    .collect();
                QueryOutput::Rows(rows)
            }
            (Some(Fetch::All), false) => QueryOutput::Rows(Vec::new()),
        };
        drop(cursor);

        let rows_fetched = match &output {
            QueryOutput::Row(row) => usize::from(!row.is_empty()),
            QueryOutput::Rows(rows) => rows.len(),
        };
        self.cursor = Some(CursorSnapshot {
            statement: statement.to_string(),
            description,
            rows_fetched,
        });
        Ok(output)
    }
}

fn default_transport() -> Option<Arc<dyn Transport>> {
    #[cfg(feature = "mssql")]
    {
        Some(Arc::new(super::client::TiberiusTransport))
    }
    #[cfg(not(feature = "mssql"))]
    {
        None
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn name(&self) -> &'static str {
        DatabaseType::Mssql.name()
    }

    fn default_query_grammar() -> GrammarBinding {
        MSSQL_GRAMMAR
    }

    fn default_platform() -> PlatformBinding {
        MSSQL_PLATFORM
    }

    async fn make_connection(&mut self) -> Result<&mut Self, SqlBridgeError> {
        self.open_handle().await?;
        Ok(self)
    }

    async fn reconnect(&mut self) -> Result<(), SqlBridgeError> {
        // Nothing to do here: after a lost link the caller closes, and the next query re-dials.
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        if self.transaction_level > 0 {
            tracing::warn!(
                level = self.transaction_level,
                "closing connection with an open transaction; it will be rolled back"
            );
            self.transaction_level = 0;
        }
        self.cursor = None;
        if let Some(mut handle) = self.handle.take() {
            handle.close().await?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn get_database_name(&self) -> Option<&str> {
        self.options.database.as_deref()
    }

    async fn begin(&mut self) -> Result<&mut (dyn DriverHandle + 'static), SqlBridgeError> {
        self.ensure_open().await?.set_autocommit(false).await?;
        self.transaction_level += 1;
        tracing::debug!(level = self.transaction_level, "begin transaction");
        self.open_handle_mut()
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        match self.transaction_level {
            0 => {
                return Err(SqlBridgeError::TransactionState(
                    "commit called without an open transaction".to_string(),
                ));
            }
            1 => {
                self.open_handle_mut()?.commit().await?;
                // the server transaction is gone from here on
                self.transaction_level = 0;
                tracing::debug!("committed outermost transaction");
                self.open_handle_mut()?.set_autocommit(true).await?;
            }
            level => {
                tracing::trace!(level, "nested commit, counter only");
                self.transaction_level -= 1;
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        match self.transaction_level {
            0 => {
                return Err(SqlBridgeError::TransactionState(
                    "rollback called without an open transaction".to_string(),
                ));
            }
            1 => {
                self.open_handle_mut()?.rollback().await?;
                // the server transaction is gone from here on
                self.transaction_level = 0;
                tracing::debug!("rolled back outermost transaction");
                self.open_handle_mut()?.set_autocommit(true).await?;
            }
            level => {
                tracing::trace!(level, "nested rollback, counter only");
                self.transaction_level -= 1;
            }
        }
        Ok(())
    }

    fn get_transaction_level(&self) -> usize {
        self.transaction_level
    }

    fn get_cursor(&self) -> Option<&CursorSnapshot> {
        self.cursor.as_ref()
    }

    async fn query(
        &mut self,
        query: &str,
        bindings: &[RowValues],
        fetch: Fetch,
    ) -> Result<QueryOutput, SqlBridgeError> {
        let statement = normalize_placeholders(query, PlaceholderStyle::Mssql);
        tracing::debug!(sql = %statement, bindings = bindings.len(), ?fetch, "query");
        self.run_statement(&statement, bindings, Some(fetch)).await
    }

    async fn query_batch(&mut self, statements: &[String]) -> Result<(), SqlBridgeError> {
        if self.dry {
            tracing::debug!(statements = statements.len(), "dry run, skipping batch");
            return Ok(());
        }
        for statement in statements {
            tracing::debug!(sql = %statement, "batch statement");
            self.run_statement(statement, &[], None).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn grammar_and_platform_need_no_instance() {
        let grammar = MssqlConnection::default_query_grammar();
        let platform = MssqlConnection::default_platform();
        assert_eq!(grammar.name, "mssql");
        assert_eq!(grammar.identifier_quotes, ('[', ']'));
        assert_eq!(platform.default_port, 1433);
        assert_eq!(platform.database_type, DatabaseType::Mssql);
    }

    #[test]
    fn construction_does_not_connect() {
        let conn = MssqlConnection::new(MssqlOptions::new("localhost", "testing"));
        assert!(conn.is_closed());
        assert_eq!(conn.get_transaction_level(), 0);
        assert_eq!(conn.get_database_name(), Some("testing"));
        assert!(conn.get_cursor().is_none());
    }

    #[tokio::test]
    async fn missing_transport_is_a_setup_error() {
        let mut conn = MssqlConnection {
            transport: None,
            ..MssqlConnection::new(MssqlOptions::new("localhost", "testing"))
        };

        let err = conn.make_connection().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Setup);
        assert!(!err.is_retryable());
        match &err {
            SqlBridgeError::DriverUnavailable(message) => {
                assert!(message.contains("features = [\"mssql\"]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // lazy paths hit the same wall
        let err = conn.query("SELECT 1", &[], Fetch::One).await.unwrap_err();
        assert!(matches!(err, SqlBridgeError::DriverUnavailable(_)));
        assert!(conn.begin().await.is_err());
        assert_eq!(conn.get_transaction_level(), 0);
        assert!(conn.is_closed());
    }

    #[cfg(not(feature = "mssql"))]
    #[tokio::test]
    async fn default_transport_needs_the_feature() {
        let mut conn = MssqlConnection::new(MssqlOptions::new("localhost", "testing"));
        let err = conn.make_connection().await.unwrap_err();
        assert!(matches!(err, SqlBridgeError::DriverUnavailable(_)));
    }
}
