//! Repository/relation adapter over tabular data sources.
//! Callers above this crate never touch connector APIs directly.

pub mod command;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod relation;
pub mod repo;

pub use command::{
    Command, CommandClass, CommandError, CommandInput, CommandKind, CommandResult,
    Specialization, SpecializationTable,
};
pub use config::{ConfigError, ConnectOptions, RepositoryConfig};
pub use db::sqlite::{SqliteConnection, SqliteProvider};
pub use db::{
    AdapterRegistry, ConnectionProvider, ConnectionUri, DataConnection, Dataset, DatabaseType,
    DbError, DbResult,
};
pub use logging::{
    default_log_level, init_logging, logging_status, LogQueryLogger, LogSink, LoggingError,
    QueryLogger, StatementLog,
};
pub use model::{Filter, Record, RowKey};
pub use relation::Relation;
pub use repo::{ConnectionSource, RepoError, RepoResult, Repository, SchemaSnapshot};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
