//! Connection, transaction and record-hydration layer for SQL Server.
//!
//! Compiled queries go in as `(sql, bindings)`; rows come back as column-keyed
//! mappings that [`model`] turns into date- and relation-aware records.
//!
//! ```rust,no_run
//! use sql_bridge::prelude::*;
//!
//! # async fn run() -> Result<(), SqlBridgeError> {
//! let options = MssqlOptions::builder()
//!     .host("localhost")
//!     .database("app")
//!     .user("sa")
//!     .password("secret")
//!     .finish();
//! let mut conn = MssqlConnection::new(options);
//!
//! conn.begin().await?;
//! conn.query("UPDATE [users] SET [name] = '?' WHERE [id] = '?'", &["joe".into(), 1.into()], Fetch::One)
//!     .await?;
//! conn.commit().await?;
//!
//! let rows = conn.query_all("SELECT * FROM [users]", &[]).await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod model;
pub mod mssql;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod translation;
pub mod types;

pub use connection::{Connection, GrammarBinding, PlatformBinding};
pub use error::{ErrorKind, SqlBridgeError};
pub use mssql::{MssqlConnection, MssqlOptions};
pub use types::{DatabaseType, RowValues};
