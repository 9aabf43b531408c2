//! SQLite connection provider.
//!
//! # Responsibility
//! - Open file or in-memory SQLite databases from `sqlite:` URIs.
//! - Enumerate tables/views as datasets and serve live dataset handles.
//!
//! # Invariants
//! - All access to the underlying `rusqlite::Connection` is serialised through
//!   one mutex shared by the connection and every dataset it handed out.
//! - After `disconnect` every handle fails with `DbError::Closed`.
//! - Every executed statement is reported to the attached `QueryLogger`.

use super::{ConnectionProvider, ConnectionUri, DataConnection, Dataset, DatabaseType};
use super::{DbError, DbResult};
use crate::config::ConnectOptions;
use crate::logging::{LogQueryLogger, QueryLogger, StatementLog};
use log::{error, info};
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod dataset;
mod value;

pub use dataset::SqliteDataset;

const DATASET_NAMES_SQL: &str = "SELECT name
FROM sqlite_master
WHERE type IN ('table', 'view')
  AND name NOT LIKE 'sqlite_%'
ORDER BY name";

const DATASET_LOOKUP_SQL: &str = "SELECT name
FROM sqlite_master
WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE
LIMIT 1";

const SCHEMA_DATASET: &str = "sqlite_master";

/// Provider for `sqlite:` / `sqlite3:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProvider;

impl SqliteProvider {
    pub const ADAPTER_ID: &'static str = "sqlite";
}

impl ConnectionProvider for SqliteProvider {
    fn adapter_id(&self) -> &str {
        Self::ADAPTER_ID
    }

    fn supports_scheme(&self, scheme: &str) -> bool {
        matches!(scheme, "sqlite" | "sqlite3")
    }

    fn connect(
        &self,
        uri: &ConnectionUri,
        options: &ConnectOptions,
    ) -> DbResult<Arc<dyn DataConnection>> {
        Ok(Arc::new(SqliteConnection::open(uri, options)?))
    }
}

/// State shared between a connection and its datasets.
pub(crate) struct SqliteShared {
    conn: Mutex<Option<Connection>>,
    logger: RwLock<Arc<dyn QueryLogger>>,
}

impl SqliteShared {
    /// Runs `op` against the open connection and reports the statement.
    pub(crate) fn run<T>(
        &self,
        dataset: &str,
        sql: &str,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> DbResult<T> {
        let started_at = Instant::now();
        let result = {
            let guard = self.conn.lock();
            let conn = guard.as_ref().ok_or(DbError::Closed)?;
            op(conn)
        };

        let logger = self.logger.read().clone();
        logger.log_statement(&StatementLog {
            dataset,
            statement: sql,
            duration: started_at.elapsed(),
            ok: result.is_ok(),
        });

        Ok(result?)
    }
}

/// A live SQLite connection.
pub struct SqliteConnection {
    shared: Arc<SqliteShared>,
}

impl SqliteConnection {
    /// Opens the database named by `uri`.
    ///
    /// # Side effects
    /// - Emits `db_open` events with duration and status.
    pub fn open(uri: &ConnectionUri, options: &ConnectOptions) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = if uri.is_memory() { "memory" } else { "file" };
        info!("event=db_open module=db status=start mode={mode}");

        match open_connection(uri, options) {
            Ok(conn) => {
                info!(
                    "event=db_open module=db status=ok mode={} duration_ms={}",
                    mode,
                    started_at.elapsed().as_millis()
                );
                Ok(Self::from_rusqlite(conn))
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={} duration_ms={} error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Wraps a connection opened by the caller; no pragmas are changed.
    pub fn from_rusqlite(conn: Connection) -> Self {
        Self {
            shared: Arc::new(SqliteShared {
                conn: Mutex::new(Some(conn)),
                logger: RwLock::new(Arc::new(LogQueryLogger)),
            }),
        }
    }

    /// Runs raw SQL, e.g. for fixtures or DDL outside the dataset API.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.shared
            .run(SCHEMA_DATASET, sql, |conn| conn.execute_batch(sql))
    }
}

impl DataConnection for SqliteConnection {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn dataset_names(&self) -> DbResult<BTreeSet<String>> {
        self.shared.run(SCHEMA_DATASET, DATASET_NAMES_SQL, |conn| {
            let mut stmt = conn.prepare(DATASET_NAMES_SQL)?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<BTreeSet<String>>>()?;
            Ok(names)
        })
    }

    fn dataset(&self, name: &str) -> DbResult<Arc<dyn Dataset>> {
        // SQLite resolves identifiers case-insensitively; keep the stored name.
        let canonical = self.shared.run(SCHEMA_DATASET, DATASET_LOOKUP_SQL, |conn| {
            conn.query_row(DATASET_LOOKUP_SQL, [name], |row| row.get::<_, String>(0))
                .optional()
        })?;
        let Some(canonical) = canonical else {
            return Err(DbError::DatasetNotFound(name.to_string()));
        };

        Ok(Arc::new(SqliteDataset::new(
            &canonical,
            Arc::clone(&self.shared),
        )))
    }

    fn set_logger(&self, logger: Arc<dyn QueryLogger>) {
        *self.shared.logger.write() = logger;
    }

    fn disconnect(&self) -> DbResult<()> {
        let Some(conn) = self.shared.conn.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| DbError::Sqlite(err))?;
        info!("event=db_close module=db status=ok");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.conn.lock().is_some()
    }
}

fn open_connection(uri: &ConnectionUri, options: &ConnectOptions) -> DbResult<Connection> {
    let conn = if uri.is_memory() {
        Connection::open_in_memory()?
    } else {
        let path = uri.database_path().ok_or_else(|| DbError::InvalidUri {
            uri: uri.to_string(),
            message: "uri does not name a database file".to_string(),
        })?;
        Connection::open_with_flags(path, open_flags(options))?
    };

    configure_connection(&conn, options)?;
    Ok(conn)
}

fn open_flags(options: &ConnectOptions) -> OpenFlags {
    let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if options.read_only {
        base | OpenFlags::SQLITE_OPEN_READ_ONLY
    } else if options.create_if_missing {
        base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    } else {
        base | OpenFlags::SQLITE_OPEN_READ_WRITE
    }
}

fn configure_connection(conn: &Connection, options: &ConnectOptions) -> DbResult<()> {
    let foreign_keys = if options.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SqliteConnection, SqliteProvider};
    use crate::config::ConnectOptions;
    use crate::db::{ConnectionProvider, ConnectionUri, DataConnection, DatabaseType, DbError};

    fn memory() -> SqliteConnection {
        let uri = ConnectionUri::parse("sqlite::memory:").expect("valid uri");
        SqliteConnection::open(&uri, &ConnectOptions::default()).expect("open memory db")
    }

    #[test]
    fn lists_tables_and_views_but_not_internal_tables() {
        let conn = memory();
        conn.execute_batch(
            "CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             CREATE VIEW adults AS SELECT * FROM people;",
        )
        .expect("create schema");

        let names = conn.dataset_names().expect("list datasets");
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["adults", "people"]);
        assert_eq!(conn.database_type(), DatabaseType::Sqlite);
    }

    #[test]
    fn unknown_dataset_is_reported() {
        let conn = memory();
        let err = conn.dataset("ghost").err().expect("lookup must fail");
        assert!(matches!(err, DbError::DatasetNotFound(name) if name == "ghost"));
    }

    #[test]
    fn dataset_lookup_ignores_case_and_keeps_stored_name() {
        let conn = memory();
        conn.execute_batch("CREATE TABLE People (id INTEGER PRIMARY KEY, name TEXT);")
            .expect("create table");

        let dataset = conn.dataset("PEOPLE").expect("case-insensitive lookup");
        assert_eq!(dataset.name(), "People");
        assert_eq!(
            dataset
                .count(&crate::model::Filter::all())
                .expect("count through canonical name"),
            0
        );
    }

    #[test]
    fn disconnect_is_idempotent_and_closes_datasets() {
        let conn = memory();
        conn.execute_batch("CREATE TABLE t (v TEXT);")
            .expect("create table");
        let dataset = conn.dataset("t").expect("dataset");

        conn.disconnect().expect("first disconnect");
        conn.disconnect().expect("second disconnect");
        assert!(!conn.is_open());

        let err = dataset
            .count(&crate::model::Filter::all())
            .expect_err("closed dataset must fail");
        assert!(matches!(err, DbError::Closed));
    }

    #[test]
    fn missing_file_without_create_flag_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.db");
        let uri = ConnectionUri::parse(&format!("sqlite://{}", path.display()))
            .expect("valid uri");

        let err = SqliteProvider
            .connect(&uri, &ConnectOptions::default())
            .err()
            .expect("missing database must fail");
        assert!(matches!(err, DbError::Sqlite(_)));

        SqliteProvider
            .connect(&uri, &ConnectOptions::default().create_if_missing(true))
            .expect("create_if_missing should create the file");
        assert!(path.exists());
    }
}
