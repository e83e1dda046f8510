//! Backend-neutral connection contract.
//!
//! Every backend connection exposes the same lifecycle, flat transaction
//! nesting and query dispatch, and advertises (statically) which SQL grammar
//! and schema platform callers should compile against.

use async_trait::async_trait;

use crate::driver::{CursorSnapshot, DriverHandle};
use crate::error::SqlBridgeError;
use crate::results::{CustomDbRow, Fetch, QueryOutput};
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, RowValues};

/// Capabilities the SQL compiler needs to emit statements for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarBinding {
    pub name: &'static str,
    pub database_type: DatabaseType,
    /// Marker style the compiled SQL may use; the connection normalizes it for the wire.
    pub placeholder_style: PlaceholderStyle,
    pub identifier_quotes: (char, char),
    pub supports_returning: bool,
    /// `OFFSET ... FETCH` pagination instead of `LIMIT`.
    pub offset_fetch_pagination: bool,
}

/// Capabilities the schema builder needs to emit DDL for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformBinding {
    pub name: &'static str,
    pub database_type: DatabaseType,
    pub default_port: u16,
    pub default_schema: &'static str,
    pub supports_schemas: bool,
    pub transactional_ddl: bool,
    pub identity_keyword: &'static str,
}

#[async_trait]
pub trait Connection: Send {
    /// Backend family name (`"mssql"`).
    fn name(&self) -> &'static str;

    /// Grammar to compile queries with. No instance or I/O needed.
    fn default_query_grammar() -> GrammarBinding
    where
        Self: Sized;

    /// Platform to compile schema DDL with. No instance or I/O needed.
    fn default_platform() -> PlatformBinding
    where
        Self: Sized;

    /// Open the physical link and keep it on the connection.
    async fn make_connection(&mut self) -> Result<&mut Self, SqlBridgeError>
    where
        Self: Sized;

    /// Re-establish a dropped link. A no-op for backends whose driver reconnects by itself.
    async fn reconnect(&mut self) -> Result<(), SqlBridgeError>;

    /// Drop the physical link. The next query reopens it.
    async fn close(&mut self) -> Result<(), SqlBridgeError>;

    fn is_closed(&self) -> bool;

    fn get_database_name(&self) -> Option<&str>;

    /// Start (or nest into) a transaction and hand back the live driver handle.
    async fn begin(&mut self) -> Result<&mut (dyn DriverHandle + 'static), SqlBridgeError>;

    /// Leave one nesting level; only the outermost level commits physically.
    async fn commit(&mut self) -> Result<(), SqlBridgeError>;

    /// Leave one nesting level; only the outermost level rolls back physically.
    async fn rollback(&mut self) -> Result<(), SqlBridgeError>;

    fn get_transaction_level(&self) -> usize;

    /// The cursor of the most recent query, if any query ran since the link opened.
    fn get_cursor(&self) -> Option<&CursorSnapshot>;

    /// Execute one compiled statement and materialize its result.
    async fn query(
        &mut self,
        query: &str,
        bindings: &[RowValues],
        fetch: Fetch,
    ) -> Result<QueryOutput, SqlBridgeError>;

    /// Execute each statement in order without bindings. Stops at the first failure.
    async fn query_batch(&mut self, statements: &[String]) -> Result<(), SqlBridgeError>;

    /// Execute and return a single row mapping (possibly empty, never absent).
    async fn query_one(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<CustomDbRow, SqlBridgeError> {
        Ok(self.query(query, bindings, Fetch::One).await?.into_row())
    }

    /// Execute and return every row in order.
    async fn query_all(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<Vec<CustomDbRow>, SqlBridgeError> {
        Ok(self.query(query, bindings, Fetch::All).await?.into_rows())
    }
}
