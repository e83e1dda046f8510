use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlBridgeError;
use crate::types::DatabaseType;

/// Default TDS port.
pub const DEFAULT_PORT: u16 = 1433;

/// Connection parameters for SQL Server.
///
/// Nothing here touches the network; values are read when the connection is
/// opened. `prefix` is applied to table names by callers and is not
/// interpreted here. `options` is passed through to the transport.
///
/// `driver` names the backend family; configuration written for another
/// backend fails to load instead of being dialled as SQL Server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MssqlOptions {
    #[serde(default)]
    pub driver: DatabaseType,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub options: HashMap<String, JsonValue>,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// Start a fluent builder.
    #[must_use]
    pub fn builder() -> MssqlOptionsBuilder {
        MssqlOptionsBuilder::default()
    }

    /// Parse options from a JSON object, coercing a string port like `"1433"`.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` for malformed JSON or a non-numeric port.
    pub fn from_json(value: JsonValue) -> Result<Self, SqlBridgeError> {
        serde_json::from_value(value)
            .map_err(|e| SqlBridgeError::ConfigError(format!("invalid mssql options: {e}")))
    }

    /// Port to dial, falling back to [`DEFAULT_PORT`].
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    #[must_use]
    pub fn option(&self, key: &str) -> Option<&JsonValue> {
        self.options.get(key)
    }

    /// Read a pass-through option as a string.
    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(JsonValue::as_str)
    }

    /// Read a pass-through option as a flag. Accepts JSON booleans and `"true"`/`"false"`/`"1"`/`"0"`.
    #[must_use]
    pub fn option_flag(&self, key: &str) -> Option<bool> {
        match self.options.get(key)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Number(n) => n.as_i64().map(|n| n != 0),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Coerce a port from anything numeric-looking.
///
/// `null`, empty strings and `0` mean "unset".
///
/// # Errors
/// Returns `SqlBridgeError::ConfigError` for values that are not a valid TCP port.
pub fn coerce_port(raw: &JsonValue) -> Result<Option<u16>, SqlBridgeError> {
    let parsed = match raw {
        JsonValue::Null => return Ok(None),
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) if s.trim().is_empty() => return Ok(None),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(0) => Ok(None),
        Some(port) => u16::try_from(port)
            .map(Some)
            .map_err(|_| SqlBridgeError::ConfigError(format!("port {port} is out of range"))),
        None => Err(SqlBridgeError::ConfigError(format!(
            "port must be numeric, got {raw}"
        ))),
    }
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonValue::deserialize(deserializer)?;
    coerce_port(&raw).map_err(serde::de::Error::custom)
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone, Default)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    /// Set the port from loosely typed input such as `"1433"`.
    ///
    /// # Errors
    /// Returns `SqlBridgeError::ConfigError` if the value is not a valid port.
    pub fn port_from(mut self, raw: impl Into<JsonValue>) -> Result<Self, SqlBridgeError> {
        self.opts.port = coerce_port(&raw.into())?;
        Ok(self)
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.opts.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.opts.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }
}
