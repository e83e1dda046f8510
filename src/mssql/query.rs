use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::numeric::Numeric;
use tiberius::{Column, ColumnData, FromSql, Query};

use super::client::MssqlClient;
use crate::driver::{ColumnDescription, Cursor};
use crate::error::SqlBridgeError;
use crate::types::RowValues;

/// Cursor over one statement on a borrowed tiberius client.
///
/// tiberius streams results off the wire; the first result set is buffered on
/// `execute` so rows can be handed out one at a time or all at once.
pub struct TiberiusCursor<'a> {
    client: &'a mut MssqlClient,
    description: Option<Vec<ColumnDescription>>,
    pending: VecDeque<Vec<RowValues>>,
}

impl<'a> TiberiusCursor<'a> {
    pub(crate) fn new(client: &'a mut MssqlClient) -> Self {
        Self {
            client,
            description: None,
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl<'a> Cursor for TiberiusCursor<'a> {
    async fn execute(&mut self, sql: &str, bindings: &[RowValues]) -> Result<(), SqlBridgeError> {
        self.description = None;
        self.pending.clear();

        let query_builder = bind_query_params(sql, bindings);
        let mut stream = query_builder.query(&mut *self.client).await?;

        self.description = stream
            .columns()
            .await?
            .map(|columns| columns.iter().map(describe_column).collect());

        for row in stream.into_first_result().await? {
            let values = row
                .into_iter()
                .map(column_to_value)
                .collect::<Result<Vec<_>, _>>()?;
            self.pending.push_back(values);
        }
        Ok(())
    }

    fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    async fn fetch_one(&mut self) -> Result<Option<Vec<RowValues>>, SqlBridgeError> {
        Ok(self.pending.pop_front())
    }

    async fn fetch_all(&mut self) -> Result<Vec<Vec<RowValues>>, SqlBridgeError> {
        Ok(self.pending.drain(..).collect())
    }
}

fn describe_column(column: &Column) -> ColumnDescription {
    ColumnDescription::new(column.name()).with_type(format!("{:?}", column.column_type()))
}

/// Convert one SQL Server value into a [`RowValues`].
///
/// # Errors
/// Returns the driver's conversion error for malformed temporal values.
pub fn column_to_value(data: ColumnData<'static>) -> Result<RowValues, SqlBridgeError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.map(|s| RowValues::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.map(|b| RowValues::Blob(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(numeric_to_f64(n))),
        ColumnData::Xml(v) => v.map(|xml| RowValues::Text(xml.into_owned().into_string())),
        ref temporal @ (ColumnData::DateTime(_)
        | ColumnData::SmallDateTime(_)
        | ColumnData::DateTime2(_)) => {
            NaiveDateTime::from_sql(temporal)?.map(RowValues::Timestamp)
        }
        ref offset @ ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(offset)?
            .map(|dt| RowValues::Timestamp(dt.naive_utc())),
        ref date @ ColumnData::Date(_) => NaiveDate::from_sql(date)?
            .map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN))),
        ref time @ ColumnData::Time(_) => NaiveTime::from_sql(time)?
            .map(|t| RowValues::Text(t.format("%H:%M:%S%.f").to_string())),
        #[allow(unreachable_patterns)]
        _ => None,
    };
    Ok(value.unwrap_or(RowValues::Null))
}

#[allow(clippy::cast_precision_loss)]
fn numeric_to_f64(n: Numeric) -> f64 {
    n.value() as f64 / 10f64.powi(i32::from(n.scale()))
}

/// Bind parameters directly to the query for SQL Server
/// Return a query builder with parameters already bound
pub fn bind_query_params<'a>(query: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query_builder = Query::new(query);

    for param in params {
        match param {
            RowValues::Int(i) => query_builder.bind(*i),
            RowValues::Float(f) => query_builder.bind(*f),
            RowValues::Text(s) => query_builder.bind(s.clone()),
            RowValues::Bool(b) => query_builder.bind(*b),
            RowValues::Timestamp(dt) => query_builder.bind(*dt),
            RowValues::Null => query_builder.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query_builder.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query_builder.bind(bytes.clone()),
        }
    }

    query_builder
}
