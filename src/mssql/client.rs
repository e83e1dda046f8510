use std::net::ToSocketAddrs;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config as TiberiusConfig, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::config::MssqlOptions;
use super::query::TiberiusCursor;
use crate::driver::{Cursor, DriverHandle, Transport};
use crate::error::SqlBridgeError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Tiberius-backed transport: TCP via tokio, TDS handshake via tiberius.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiberiusTransport;

#[async_trait]
impl Transport for TiberiusTransport {
    fn name(&self) -> &'static str {
        "tiberius"
    }

    async fn connect(
        &self,
        options: &MssqlOptions,
        autocommit: bool,
    ) -> Result<Box<dyn DriverHandle>, SqlBridgeError> {
        let client = create_mssql_client(options).await?;
        let mut handle = TiberiusHandle {
            client,
            autocommit: true,
        };
        if !autocommit {
            handle.set_autocommit(false).await?;
        }
        Ok(Box::new(handle))
    }
}

/// Helper function to create a new MSSQL connection
///
/// # Errors
/// Address resolution and TCP failures surface as `tiberius::error::Error::Io`;
/// handshake failures are returned exactly as tiberius reports them.
pub async fn create_mssql_client(options: &MssqlOptions) -> Result<MssqlClient, SqlBridgeError> {
    let config = build_tiberius_config(options)?;

    if options.option_str("instance_name").is_some() {
        // Named instances resolve their port through the SQL Browser service.
        let tcp = TcpStream::connect_named(&config).await?;
        tcp.set_nodelay(true)
            .map_err(|e| io_error(&e, "TCP configuration error"))?;
        return Ok(Client::connect(config, tcp.compat_write()).await?);
    }

    let server = options.host.as_deref().unwrap_or("localhost");
    let port = options.effective_port();

    let server_addr = (server, port)
        .to_socket_addrs()
        .map_err(|e| io_error(&e, "Failed to resolve server address"))?
        .next()
        .ok_or_else(|| {
            SqlBridgeError::ConnectionError(format!("No valid address found for {server}"))
        })?;

    tracing::debug!(%server_addr, database = ?options.database, "opening SQL Server connection");

    let tcp = TcpStream::connect(server_addr)
        .await
        .map_err(|e| io_error(&e, "TCP connection error"))?;
    tcp.set_nodelay(true)
        .map_err(|e| io_error(&e, "TCP configuration error"))?;

    Ok(Client::connect(config, tcp.compat_write()).await?)
}

fn io_error(err: &std::io::Error, context: &str) -> SqlBridgeError {
    SqlBridgeError::MssqlError(tiberius::error::Error::Io {
        kind: err.kind(),
        message: format!("{context}: {err}"),
    })
}

/// Translate connection options into a tiberius `Config`.
///
/// Recognized pass-through options: `instance_name`, `application_name`,
/// `trust_cert` (default true) and `encryption` (`off`, `on`, `required`, `not_supported`).
///
/// # Errors
/// Returns `SqlBridgeError::ConfigError` for an unknown encryption level.
pub fn build_tiberius_config(opts: &MssqlOptions) -> Result<TiberiusConfig, SqlBridgeError> {
    let mut config = TiberiusConfig::new();
    config.host(opts.host.as_deref().unwrap_or("localhost"));
    config.port(opts.effective_port());
    if let Some(database) = &opts.database {
        config.database(database);
    }
    config.authentication(AuthMethod::sql_server(
        opts.user.as_deref().unwrap_or_default(),
        opts.password.as_deref().unwrap_or_default(),
    ));
    if let Some(instance) = opts.option_str("instance_name") {
        config.instance_name(instance);
    }
    if let Some(app) = opts.option_str("application_name") {
        config.application_name(app);
    }
    if let Some(level) = opts.option_str("encryption") {
        config.encryption(parse_encryption(level)?);
    }
    if opts.option_flag("trust_cert").unwrap_or(true) {
        config.trust_cert();
    }
    Ok(config)
}

fn parse_encryption(level: &str) -> Result<EncryptionLevel, SqlBridgeError> {
    match level.to_ascii_lowercase().as_str() {
        "off" => Ok(EncryptionLevel::Off),
        "on" => Ok(EncryptionLevel::On),
        "required" => Ok(EncryptionLevel::Required),
        "not_supported" => Ok(EncryptionLevel::NotSupported),
        other => Err(SqlBridgeError::ConfigError(format!(
            "unknown encryption level `{other}`"
        ))),
    }
}

/// A live tiberius client.
///
/// TDS has no client-side autocommit switch, so autocommit off is expressed as
/// `SET IMPLICIT_TRANSACTIONS ON`: the server opens a transaction with the
/// next statement and holds it until `COMMIT`/`ROLLBACK`.
pub struct TiberiusHandle {
    client: MssqlClient,
    autocommit: bool,
}

impl std::fmt::Debug for TiberiusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiberiusHandle")
            .field("client", &"<MssqlClient>")
            .field("autocommit", &self.autocommit)
            .finish()
    }
}

impl TiberiusHandle {
    async fn simple(&mut self, sql: &str) -> Result<(), SqlBridgeError> {
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

#[async_trait]
impl DriverHandle for TiberiusHandle {
    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), SqlBridgeError> {
        if enabled == self.autocommit {
            return Ok(());
        }
        let sql = if enabled {
            "SET IMPLICIT_TRANSACTIONS OFF"
        } else {
            "SET IMPLICIT_TRANSACTIONS ON"
        };
        self.simple(sql).await?;
        self.autocommit = enabled;
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn commit(&mut self) -> Result<(), SqlBridgeError> {
        self.simple("IF @@TRANCOUNT > 0 COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) -> Result<(), SqlBridgeError> {
        self.simple("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
    }

    fn cursor(&mut self) -> Box<dyn Cursor + '_> {
        Box::new(TiberiusCursor::new(&mut self.client))
    }

    async fn close(&mut self) -> Result<(), SqlBridgeError> {
        // tiberius closes the socket on drop; flush any open implicit transaction first.
        if !self.autocommit {
            self.rollback().await?;
        }
        Ok(())
    }
}
