//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::connection::{Connection, GrammarBinding, PlatformBinding};
pub use crate::driver::{ColumnDescription, Cursor, CursorSnapshot, DriverHandle, Transport};
pub use crate::error::{ErrorKind, SqlBridgeError};
pub use crate::model::{Attribute, DateTimeValue, Model, ModelDefinition, Related};
pub use crate::mssql::{MssqlConnection, MssqlOptions, MssqlOptionsBuilder};
pub use crate::pool::{ConfigAndPool, ConnectionPool, PooledConnection};
pub use crate::results::{CustomDbRow, Fetch, QueryOutput};
pub use crate::translation::{PlaceholderStyle, normalize_placeholders};
pub use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "mssql")]
pub use crate::mssql::TiberiusTransport;
