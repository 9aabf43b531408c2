//! Dataset-name snapshot captured when a repository is constructed.

use crate::db::{DataConnection, DbResult};
use std::collections::BTreeSet;

/// Immutable set of dataset names.
///
/// Never refreshed; a dataset added to the source later is only visible
/// after constructing a new `Repository`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    names: BTreeSet<String>,
}

impl SchemaSnapshot {
    pub fn capture(connection: &dyn DataConnection) -> DbResult<Self> {
        Ok(Self {
            names: connection.dataset_names()?,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for SchemaSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
