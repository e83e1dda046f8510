use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlBridgeError {
    /// Raised by the SQL Server driver, passed through unchanged.
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Driver not found: {0}")]
    DriverUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction state error: {0}")]
    TransactionState(String),

    #[error("Attribute `{attribute}` not found on {model}")]
    AttributeNotFound { model: String, attribute: String },

    #[error("Attribute `{attribute}` holds `{value}`, which is not a recognizable date")]
    InvalidDate { attribute: String, value: String },

    #[error("Pool error: {0}")]
    PoolError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

/// Coarse classification of a [`SqlBridgeError`], used by callers deciding
/// whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required transport is missing; needs operator intervention.
    Setup,
    /// Handshake or network failure.
    Connectivity,
    /// The backend rejected the statement.
    Execution,
    /// A hydrated record was asked for something it does not carry.
    DataShape,
    /// `commit`/`rollback` without a matching `begin`.
    TransactionState,
    /// Bad connection options.
    Configuration,
}

impl SqlBridgeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "mssql")]
            SqlBridgeError::MssqlError(err) => mssql_error_kind(err),
            SqlBridgeError::DriverUnavailable(_) => ErrorKind::Setup,
            SqlBridgeError::ConfigError(_) => ErrorKind::Configuration,
            SqlBridgeError::ConnectionError(_) | SqlBridgeError::PoolError(_) => {
                ErrorKind::Connectivity
            }
            SqlBridgeError::ExecutionError(_) | SqlBridgeError::Other(_) => ErrorKind::Execution,
            SqlBridgeError::TransactionState(_) => ErrorKind::TransactionState,
            SqlBridgeError::AttributeNotFound { .. } | SqlBridgeError::InvalidDate { .. } => {
                ErrorKind::DataShape
            }
        }
    }

    /// True for failures a caller may reasonably retry (after reconnecting).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Connectivity
    }
}

#[cfg(feature = "mssql")]
fn mssql_error_kind(err: &tiberius::error::Error) -> ErrorKind {
    use tiberius::error::Error;
    match err {
        Error::Io { .. } | Error::Tls(_) | Error::Routing { .. } => ErrorKind::Connectivity,
        _ => ErrorKind::Execution,
    }
}

impl From<deadpool::managed::PoolError<SqlBridgeError>> for SqlBridgeError {
    fn from(err: deadpool::managed::PoolError<SqlBridgeError>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(inner) => inner,
            other => SqlBridgeError::PoolError(other.to_string()),
        }
    }
}
