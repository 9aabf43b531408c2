//! Traits implemented by connection providers.

use super::{ConnectionUri, DatabaseType, DbError, DbResult};
use crate::config::ConnectOptions;
use crate::logging::QueryLogger;
use crate::model::{Filter, Record, RowKey};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Opens connections for the URI schemes it understands.
pub trait ConnectionProvider: Send + Sync {
    /// Stable adapter id used for explicit selection, e.g. `sqlite`.
    fn adapter_id(&self) -> &str;

    fn supports_scheme(&self, scheme: &str) -> bool;

    fn connect(
        &self,
        uri: &ConnectionUri,
        options: &ConnectOptions,
    ) -> DbResult<Arc<dyn DataConnection>>;
}

/// A live link to one data source.
pub trait DataConnection: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Enumerates dataset names currently present in the source.
    fn dataset_names(&self) -> DbResult<BTreeSet<String>>;

    /// Resolves a live dataset handle.
    ///
    /// Returns `DbError::DatasetNotFound` when the source has no such dataset.
    fn dataset(&self, name: &str) -> DbResult<Arc<dyn Dataset>>;

    /// Routes statement logging of all later operations to `logger`.
    fn set_logger(&self, logger: Arc<dyn QueryLogger>);

    /// Releases the physical connection. Calling it again is a no-op.
    fn disconnect(&self) -> DbResult<()>;

    fn is_open(&self) -> bool;
}

/// A named, queryable collection (e.g. a table).
///
/// Row keys are stable for the lifetime of a row and are the only handle
/// generic commands use to re-read rows they touched.
pub trait Dataset: Send + Sync {
    fn name(&self) -> &str;

    /// Database type of the owning connection.
    fn database_type(&self) -> DatabaseType;

    fn columns(&self) -> DbResult<Vec<String>>;

    fn select(&self, filter: &Filter) -> DbResult<Vec<Record>>;

    /// First row matching `filter`, in provider order.
    ///
    /// The default reads every matching row; providers override it with a
    /// bounded query.
    fn select_first(&self, filter: &Filter) -> DbResult<Option<Record>> {
        Ok(self.select(filter)?.into_iter().next())
    }

    fn count(&self, filter: &Filter) -> DbResult<u64>;

    fn keys(&self, filter: &Filter) -> DbResult<Vec<RowKey>>;

    /// Reads rows by key, ordered by key.
    fn fetch(&self, keys: &[RowKey]) -> DbResult<Vec<Record>>;

    fn insert(&self, record: &Record) -> DbResult<RowKey>;

    fn update_keys(&self, keys: &[RowKey], changes: &Record) -> DbResult<usize>;

    fn delete_keys(&self, keys: &[RowKey]) -> DbResult<usize>;

    /// Inserts and returns the stored row in one round trip.
    fn insert_returning(&self, _record: &Record) -> DbResult<Record> {
        Err(DbError::Unsupported {
            operation: "insert_returning",
            database_type: self.database_type(),
        })
    }

    /// Updates and returns the changed rows in one round trip.
    fn update_returning(&self, _filter: &Filter, _changes: &Record) -> DbResult<Vec<Record>> {
        Err(DbError::Unsupported {
            operation: "update_returning",
            database_type: self.database_type(),
        })
    }
}
