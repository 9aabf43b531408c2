//! Record and filter types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One row: column name to JSON value.
///
/// `BTreeMap` keeps column order deterministic for generated statements and
/// for serialized output.
pub type Record = BTreeMap<String, Value>;

/// Provider-assigned stable row identifier (SQLite `rowid`).
pub type RowKey = i64;

/// Conjunction of `column = value` constraints.
///
/// A `Value::Null` constraint matches rows where the column is NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: BTreeMap<String, Value>,
}

impl Filter {
    /// Filter that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Single-column equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(column, value)
    }

    /// Adds one more equality constraint.
    pub fn and(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(column.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Iterates constraints in column order.
    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }

    /// Returns whether `record` satisfies every constraint.
    ///
    /// Used by providers that cannot push filters down to the source.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| match record.get(column) {
                Some(actual) => actual == expected,
                None => expected.is_null(),
            })
    }
}

impl From<Record> for Filter {
    fn from(value: Record) -> Self {
        Self { conditions: value }
    }
}
