// MSSQL module - SQL Server connection over a pluggable transport
//
// - config: connection options, port coercion and the options builder
// - connection: `MssqlConnection`, lifecycle, flat transactions and query dispatch
// - client: tiberius transport (TCP + TDS handshake)
// - query: tiberius cursor, parameter binding and value extraction

pub mod config;
pub mod connection;

#[cfg(feature = "mssql")]
pub mod client;
#[cfg(feature = "mssql")]
pub mod query;

pub use config::{DEFAULT_PORT, MssqlOptions, MssqlOptionsBuilder, coerce_port};
pub use connection::MssqlConnection;

#[cfg(feature = "mssql")]
pub use client::{MssqlClient, TiberiusHandle, TiberiusTransport, create_mssql_client};
#[cfg(feature = "mssql")]
pub use query::{TiberiusCursor, bind_query_params};
