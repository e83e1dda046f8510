use super::row::CustomDbRow;

/// How many rows a query should materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fetch {
    /// Fetch a single row; statements without a column description yield the empty mapping.
    One,
    /// Fetch every row in order.
    #[default]
    All,
}

/// Materialized result of [`Connection::query`](crate::connection::Connection::query).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Row(CustomDbRow),
    Rows(Vec<CustomDbRow>),
}

impl QueryOutput {
    /// Collapse to a single row: the row itself, or the first of many (empty mapping if none).
    #[must_use]
    pub fn into_row(self) -> CustomDbRow {
        match self {
            QueryOutput::Row(row) => row,
            QueryOutput::Rows(rows) => rows.into_iter().next().unwrap_or_default(),
        }
    }

    /// Expand to a list of rows. An empty single-row mapping becomes an empty list.
    #[must_use]
    pub fn into_rows(self) -> Vec<CustomDbRow> {
        match self {
            QueryOutput::Row(row) if row.is_empty() => Vec::new(),
            QueryOutput::Row(row) => vec![row],
            QueryOutput::Rows(rows) => rows,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            QueryOutput::Row(row) => row.is_empty(),
            QueryOutput::Rows(rows) => rows.is_empty(),
        }
    }
}
