//! Transport boundary.
//!
//! A [`Transport`] knows how to open a physical link ([`DriverHandle`]) to a
//! database engine. Each statement runs through a [`Cursor`] borrowed from the
//! handle; the borrow ends (and the cursor is released) when it is dropped,
//! on success and on error alike.

use std::fmt;

use async_trait::async_trait;

use crate::error::SqlBridgeError;
use crate::mssql::MssqlOptions;
use crate::types::RowValues;

/// Metadata for one result column of the last executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    /// Driver-specific type label, when the driver reports one.
    pub type_name: Option<String>,
}

impl ColumnDescription {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// Opens physical connections.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Name of the driver, for logs and error messages.
    fn name(&self) -> &'static str;

    /// Connect using `options`, with autocommit initially set to `autocommit`.
    ///
    /// # Errors
    /// Handshake failures are returned as the driver reports them.
    async fn connect(
        &self,
        options: &MssqlOptions,
        autocommit: bool,
    ) -> Result<Box<dyn DriverHandle>, SqlBridgeError>;
}

/// One live link to a database engine.
#[async_trait]
pub trait DriverHandle: Send {
    /// Toggle autocommit. Turning it off starts an implicit transaction on the next statement.
    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), SqlBridgeError>;

    fn autocommit(&self) -> bool;

    async fn commit(&mut self) -> Result<(), SqlBridgeError>;

    async fn rollback(&mut self) -> Result<(), SqlBridgeError>;

    /// Open a cursor scoped to this handle.
    fn cursor(&mut self) -> Box<dyn Cursor + '_>;

    /// Shut the link down. The handle must not be used afterwards.
    async fn close(&mut self) -> Result<(), SqlBridgeError>;
}

/// Statement execution and row retrieval for a single statement at a time.
#[async_trait]
pub trait Cursor: Send {
    /// Execute `sql` with positional `bindings`.
    async fn execute(&mut self, sql: &str, bindings: &[RowValues]) -> Result<(), SqlBridgeError>;

    /// Column metadata of the last executed statement; `None` when it produced no result columns.
    fn description(&self) -> Option<&[ColumnDescription]>;

    /// Next row of the current result, if any.
    async fn fetch_one(&mut self) -> Result<Option<Vec<RowValues>>, SqlBridgeError>;

    /// All remaining rows of the current result.
    async fn fetch_all(&mut self) -> Result<Vec<Vec<RowValues>>, SqlBridgeError>;
}

/// What a connection remembers about its most recent cursor.
///
/// Replaced by every query; cleared when the connection closes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorSnapshot {
    /// Statement text as sent to the driver (after placeholder normalization).
    pub statement: String,
    pub description: Option<Vec<ColumnDescription>>,
    pub rows_fetched: usize,
}

impl CursorSnapshot {
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.description
            .iter()
            .flatten()
            .map(|col| col.name.as_str())
            .collect()
    }
}
