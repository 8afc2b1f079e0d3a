//! Pivot - join-table row representation for many-to-many relations
//!
//! A pivot carries the two foreign keys plus whatever extra columns the
//! relation declared. Hydrated rows are stashed on each related model under
//! the reserved `pivot` relation name.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::dictionary_key;

/// Reserved relation-cache name for hydrated pivot rows
pub const PIVOT_RELATION: &str = "pivot";

/// A many-to-many join-table row
#[derive(Debug, Clone)]
pub struct Pivot {
    /// Join table name
    pub table: String,
    /// Column holding the owning side's key
    pub foreign_pivot_key: String,
    /// Column holding the related side's key
    pub related_pivot_key: String,
    /// The owning side's key value
    pub foreign_value: Value,
    /// The related side's key value
    pub related_value: Value,
    /// Extra declared pivot columns
    pub attributes: HashMap<String, Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pivot {
    /// Read an extra pivot column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Composite identity: the `(foreign, related)` key value pair
    pub fn identity(&self) -> (String, String) {
        (
            dictionary_key(&self.foreign_value),
            dictionary_key(&self.related_value),
        )
    }
}

/// Decode a dynamically typed column into a JSON value
///
/// Tries the common key/column types in order; a column that decodes as none
/// of them comes back as `Null`.
pub(crate) fn row_value(row: &PgRow, column: &str) -> Value {
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(column) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<Uuid>, _>(column) {
        return value
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(column) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(column) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    Value::Null
}

/// Decode a timestamp column, if present and non-null
pub(crate) fn row_timestamp(row: &PgRow, column: &str) -> Option<DateTime<Utc>> {
    row.try_get::<Option<DateTime<Utc>>, _>(column)
        .ok()
        .flatten()
}
