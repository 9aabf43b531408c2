//! Connection provider contracts and the bundled SQLite provider.
//!
//! # Responsibility
//! - Define the traits a data source must implement to be served by a
//!   `Repository` (`ConnectionProvider`, `DataConnection`, `Dataset`).
//! - Resolve connection URIs to providers through an explicit registry.
//! - Ship one concrete provider backed by SQLite.
//!
//! # Invariants
//! - Provider errors are reported as `DbError`; callers above this layer never
//!   see connector-specific error types directly.
//! - Nothing in this module retries a failed call.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod adapters;
mod database_type;
mod provider;
pub mod sqlite;
mod uri;

pub use adapters::{AdapterRegistry, AdapterRegistryError};
pub use database_type::DatabaseType;
pub use provider::{ConnectionProvider, DataConnection, Dataset};
pub use uri::ConnectionUri;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidUri {
        uri: String,
        message: String,
    },
    Adapter(AdapterRegistryError),
    DatasetNotFound(String),
    /// Operation attempted on a connection that was already released.
    Closed,
    Unsupported {
        operation: &'static str,
        database_type: DatabaseType,
    },
    InvalidData(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidUri { uri, message } => {
                write!(f, "invalid connection uri `{uri}`: {message}")
            }
            Self::Adapter(err) => write!(f, "{err}"),
            Self::DatasetNotFound(name) => write!(f, "dataset not found: {name}"),
            Self::Closed => write!(f, "connection is closed"),
            Self::Unsupported {
                operation,
                database_type,
            } => write!(
                f,
                "operation `{operation}` is not supported by database type `{database_type}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Adapter(err) => Some(err),
            Self::InvalidUri { .. }
            | Self::DatasetNotFound(_)
            | Self::Closed
            | Self::Unsupported { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<AdapterRegistryError> for DbError {
    fn from(value: AdapterRegistryError) -> Self {
        Self::Adapter(value)
    }
}
