//! Record hydration.
//!
//! Raw row mappings become [`Model`]s: attribute bags that know which of
//! their columns hold dates and which related records hang off them.
//!
//! ```rust
//! use sql_bridge::prelude::*;
//!
//! struct Task;
//!
//! impl ModelDefinition for Task {
//!     const DATES: &'static [&'static str] = &["due_date"];
//! }
//!
//! let task = Task::hydrate([("title", "ship it"), ("due_date", "2020-11-28 11:42:07")]);
//! assert_eq!(task.value("title")?.as_text(), Some("ship it"));
//! assert!(task.date("due_date")?.unwrap().is_past());
//! # Ok::<(), SqlBridgeError>(())
//! ```

pub mod date;
pub mod relation;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::error::SqlBridgeError;
use crate::results::{CustomDbRow, QueryOutput};
use crate::types::RowValues;

pub use date::DateTimeValue;
pub use relation::Related;

/// Static description of a model type: its table and date columns.
pub trait ModelDefinition {
    const TABLE: Option<&'static str> = None;
    /// Columns read back as [`DateTimeValue`]s.
    const DATES: &'static [&'static str] = &[];

    /// Name used in error messages; the type's own name by default.
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Wrap one raw row. No date is parsed until it is read.
    fn hydrate<I, K, V>(raw: I) -> Model
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        Model::new(Self::model_name(), Self::DATES.iter().copied())
            .with_table(Self::TABLE)
            .fill(raw)
    }

    /// Wrap every row of a result.
    fn hydrate_all(rows: Vec<CustomDbRow>) -> Vec<Model>
    where
        Self: Sized,
    {
        rows.into_iter().map(Self::hydrate).collect()
    }

    /// Wrap whatever a query returned. An empty single-row mapping yields no models.
    fn hydrate_output(output: QueryOutput) -> Vec<Model>
    where
        Self: Sized,
    {
        Self::hydrate_all(output.into_rows())
    }
}

/// What an attribute read resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Attribute<'a> {
    Value(&'a RowValues),
    /// A declared date column; `None` when the column is NULL.
    Date(Option<DateTimeValue>),
    Relation(&'a Related),
}

#[derive(Debug, Clone)]
struct CachedDate {
    raw: RowValues,
    parsed: DateTimeValue,
}

/// A hydrated record.
#[derive(Debug)]
pub struct Model {
    name: Arc<str>,
    table: Option<&'static str>,
    dates: Arc<HashSet<String>>,
    attributes: HashMap<String, RowValues>,
    relations: HashMap<String, Related>,
    date_cache: Mutex<HashMap<String, CachedDate>>,
}

impl Clone for Model {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            table: self.table,
            dates: Arc::clone(&self.dates),
            attributes: self.attributes.clone(),
            relations: self.relations.clone(),
            date_cache: Mutex::new(self.cache().clone()),
        }
    }
}

impl Model {
    /// An empty model named `name` with the given date columns.
    pub fn new<D, S>(name: &str, dates: D) -> Self
    where
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Arc::from(name),
            table: None,
            dates: Arc::new(dates.into_iter().map(Into::into).collect()),
            attributes: HashMap::new(),
            relations: HashMap::new(),
            date_cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: Option<&'static str>) -> Self {
        self.table = table;
        self
    }

    /// Set every `(column, value)` pair, replacing existing values.
    #[must_use]
    pub fn fill<I, K, V>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        for (key, value) in raw {
            self.attributes.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> Option<&'static str> {
        self.table
    }

    #[must_use]
    pub fn is_date(&self, key: &str) -> bool {
        self.dates.contains(key)
    }

    /// True if `key` is an attribute or a relation.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.attributes.contains_key(key) || self.relations.contains_key(key)
    }

    /// Attribute names, sorted.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, RowValues> {
        &self.attributes
    }

    /// Read `key` the way a field access would: date columns come back parsed,
    /// plain columns as stored, relation names as their related records.
    ///
    /// # Errors
    /// `AttributeNotFound` if `key` is neither a column nor a relation;
    /// `InvalidDate` if a date column holds something unparseable.
    pub fn get(&self, key: &str) -> Result<Attribute<'_>, SqlBridgeError> {
        if let Some(value) = self.attributes.get(key) {
            if self.is_date(key) {
                return self.date(key).map(Attribute::Date);
            }
            return Ok(Attribute::Value(value));
        }
        if let Some(related) = self.relations.get(key) {
            return Ok(Attribute::Relation(related));
        }
        Err(self.not_found(key))
    }

    /// The stored value of a column. NULL columns are `Ok(&RowValues::Null)`.
    ///
    /// # Errors
    /// `AttributeNotFound` if the column is absent.
    pub fn value(&self, key: &str) -> Result<&RowValues, SqlBridgeError> {
        self.attributes.get(key).ok_or_else(|| self.not_found(key))
    }

    /// A column read as a date, parsed on first access and cached until its raw value changes.
    ///
    /// # Errors
    /// `AttributeNotFound` if the column is absent, `InvalidDate` if it is not a date.
    pub fn date(&self, key: &str) -> Result<Option<DateTimeValue>, SqlBridgeError> {
        let raw = self.value(key)?;
        if raw.is_null() {
            return Ok(None);
        }

        let mut cache = self.cache();
        if let Some(hit) = cache.get(key) {
            if hit.raw == *raw {
                return Ok(Some(hit.parsed));
            }
        }

        let parsed = DateTimeValue::from_row_value(raw)
            .map_err(|()| SqlBridgeError::InvalidDate {
                attribute: key.to_string(),
                value: raw_display(raw),
            })?
            .ok_or_else(|| self.not_found(key))?;
        cache.insert(
            key.to_string(),
            CachedDate {
                raw: raw.clone(),
                parsed,
            },
        );
        Ok(Some(parsed))
    }

    /// The records attached under `key`.
    ///
    /// # Errors
    /// `AttributeNotFound` if no relation of that name was added.
    pub fn relation(&self, key: &str) -> Result<&Related, SqlBridgeError> {
        self.relations.get(key).ok_or_else(|| self.not_found(key))
    }

    #[must_use]
    pub fn relations(&self) -> &HashMap<String, Related> {
        &self.relations
    }

    /// Merge relation name → related record(s) pairs into this model.
    pub fn add_relation<I, K, R>(&mut self, relations: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<Related>,
    {
        for (name, related) in relations {
            self.relations.insert(name.into(), related.into());
        }
        self
    }

    /// Overwrite one column. A cached date for it is dropped on the next read.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<RowValues>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// JSON view: date columns as RFC 3339 strings, relations nested.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (key, value) in &self.attributes {
            let rendered = match self.is_date(key).then(|| self.date(key)) {
                Some(Ok(Some(date))) => JsonValue::String(date.to_rfc3339()),
                _ => value.to_json(),
            };
            map.insert(key.clone(), rendered);
        }
        for (key, related) in &self.relations {
            map.insert(key.clone(), related.to_json());
        }
        JsonValue::Object(map)
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, CachedDate>> {
        match self.date_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn not_found(&self, key: &str) -> SqlBridgeError {
        SqlBridgeError::AttributeNotFound {
            model: self.name.to_string(),
            attribute: key.to_string(),
        }
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn raw_display(value: &RowValues) -> String {
    match value {
        RowValues::Text(text) => text.clone(),
        other => format!("{other:?}"),
    }
}
