//! SQLite table/view dataset.

use super::value::{from_sql, to_sql};
use super::SqliteShared;
use crate::db::{Dataset, DatabaseType, DbError, DbResult};
use crate::model::{Filter, Record, RowKey};
use log::error;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Statement};
use std::sync::Arc;

/// Keys bound per `rowid IN (...)` statement, well below SQLite's
/// bound-variable limit.
const KEY_BATCH_SIZE: usize = 500;
const KEY_BATCH_SAVEPOINT: &str = "tabula_key_batch";

/// Live handle over one SQLite table or view.
///
/// Row keys are SQLite `rowid`s, so key-based operations require a rowid
/// table.
pub struct SqliteDataset {
    name: String,
    table: String,
    shared: Arc<SqliteShared>,
}

impl SqliteDataset {
    pub(crate) fn new(name: &str, shared: Arc<SqliteShared>) -> Self {
        Self {
            name: name.to_string(),
            table: quote_ident(name),
            shared,
        }
    }

    fn query_records(&self, sql: &str, bind_values: Vec<SqlValue>) -> DbResult<Vec<Record>> {
        self.shared.run(&self.name, sql, |conn| {
            let mut stmt = conn.prepare(sql)?;
            read_records(&mut stmt, bind_values)
        })
    }

    /// Runs `statement(batch_len)` once per key batch inside one savepoint.
    ///
    /// `leading` values are bound before each batch's keys. Returns the total
    /// number of changed rows.
    fn execute_by_keys(
        &self,
        keys: &[RowKey],
        leading: &[SqlValue],
        statement: impl Fn(usize) -> String,
    ) -> DbResult<usize> {
        let logged = statement(keys.len().min(KEY_BATCH_SIZE));
        self.shared.run(&self.name, &logged, |conn| {
            within_savepoint(conn, |conn| {
                let mut changed = 0;
                for batch in keys.chunks(KEY_BATCH_SIZE) {
                    let sql = statement(batch.len());
                    let bind_values = leading.iter().cloned().chain(key_values(batch));
                    changed += conn.execute(&sql, params_from_iter(bind_values))?;
                }
                Ok(changed)
            })
        })
    }
}

impl Dataset for SqliteDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn columns(&self) -> DbResult<Vec<String>> {
        let sql = format!("SELECT * FROM {} LIMIT 0", self.table);
        self.shared.run(&self.name, &sql, |conn| {
            let stmt = conn.prepare(&sql)?;
            Ok(column_names(&stmt))
        })
    }

    fn select(&self, filter: &Filter) -> DbResult<Vec<Record>> {
        let mut bind_values = Vec::new();
        let sql = format!(
            "SELECT * FROM {}{}",
            self.table,
            where_clause(filter, &mut bind_values)?
        );
        self.query_records(&sql, bind_values)
    }

    fn select_first(&self, filter: &Filter) -> DbResult<Option<Record>> {
        let mut bind_values = Vec::new();
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            self.table,
            where_clause(filter, &mut bind_values)?
        );
        Ok(self.query_records(&sql, bind_values)?.into_iter().next())
    }

    fn count(&self, filter: &Filter) -> DbResult<u64> {
        let mut bind_values = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            self.table,
            where_clause(filter, &mut bind_values)?
        );
        let count = self.shared.run(&self.name, &sql, |conn| {
            conn.query_row(&sql, params_from_iter(bind_values), |row| {
                row.get::<_, i64>(0)
            })
        })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn keys(&self, filter: &Filter) -> DbResult<Vec<RowKey>> {
        let mut bind_values = Vec::new();
        let sql = format!(
            "SELECT rowid FROM {}{} ORDER BY rowid",
            self.table,
            where_clause(filter, &mut bind_values)?
        );
        self.shared.run(&self.name, &sql, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let keys = stmt
                .query_map(params_from_iter(bind_values), |row| row.get::<_, RowKey>(0))?
                .collect::<rusqlite::Result<Vec<RowKey>>>()?;
            Ok(keys)
        })
    }

    fn fetch(&self, keys: &[RowKey]) -> DbResult<Vec<Record>> {
        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut records = Vec::with_capacity(sorted.len());
        for batch in sorted.chunks(KEY_BATCH_SIZE) {
            let sql = format!(
                "SELECT * FROM {} WHERE rowid IN ({}) ORDER BY rowid",
                self.table,
                placeholders(batch.len())
            );
            records.extend(self.query_records(&sql, key_values(batch))?);
        }
        Ok(records)
    }

    fn insert(&self, record: &Record) -> DbResult<RowKey> {
        let (sql, bind_values) = insert_statement(&self.table, record)?;
        self.shared.run(&self.name, &sql, |conn| {
            conn.execute(&sql, params_from_iter(bind_values))?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update_keys(&self, keys: &[RowKey], changes: &Record) -> DbResult<usize> {
        if keys.is_empty() || changes.is_empty() {
            return Ok(0);
        }
        let mut set_values = Vec::new();
        let set = set_clause(changes, &mut set_values)?;
        self.execute_by_keys(keys, &set_values, |count| {
            format!(
                "UPDATE {} SET {} WHERE rowid IN ({})",
                self.table,
                set,
                placeholders(count)
            )
        })
    }

    fn delete_keys(&self, keys: &[RowKey]) -> DbResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.execute_by_keys(keys, &[], |count| {
            format!(
                "DELETE FROM {} WHERE rowid IN ({})",
                self.table,
                placeholders(count)
            )
        })
    }

    fn insert_returning(&self, record: &Record) -> DbResult<Record> {
        let (sql, bind_values) = insert_statement(&self.table, record)?;
        let sql = format!("{sql} RETURNING *");
        let mut rows = self.query_records(&sql, bind_values)?;
        rows.pop().ok_or_else(|| {
            DbError::InvalidData(format!("insert into `{}` returned no row", self.name))
        })
    }

    fn update_returning(&self, filter: &Filter, changes: &Record) -> DbResult<Vec<Record>> {
        if changes.is_empty() {
            return self.select(filter);
        }
        let mut bind_values = Vec::new();
        let set = set_clause(changes, &mut bind_values)?;
        let sql = format!(
            "UPDATE {} SET {}{} RETURNING *",
            self.table,
            set,
            where_clause(filter, &mut bind_values)?
        );
        self.query_records(&sql, bind_values)
    }
}

/// Applies `op` fully or not at all; nests inside an open transaction.
fn within_savepoint<T>(
    conn: &Connection,
    op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    conn.execute_batch(&format!("SAVEPOINT {KEY_BATCH_SAVEPOINT}"))?;
    match op(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {KEY_BATCH_SAVEPOINT}"))?;
            Ok(value)
        }
        Err(err) => {
            let rollback = format!(
                "ROLLBACK TO {KEY_BATCH_SAVEPOINT}; RELEASE {KEY_BATCH_SAVEPOINT}"
            );
            if let Err(rollback_err) = conn.execute_batch(&rollback) {
                error!(
                    "event=key_batch_rollback module=db status=error error={}",
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

fn insert_statement(table: &str, record: &Record) -> DbResult<(String, Vec<SqlValue>)> {
    if record.is_empty() {
        return Ok((format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new()));
    }
    let columns = record
        .keys()
        .map(|column| quote_ident(column))
        .collect::<Vec<_>>()
        .join(", ");
    let bind_values = record.values().map(to_sql).collect::<DbResult<Vec<_>>>()?;
    let sql = format!(
        "INSERT INTO {table} ({columns}) VALUES ({})",
        placeholders(bind_values.len())
    );
    Ok((sql, bind_values))
}

fn where_clause(filter: &Filter, bind_values: &mut Vec<SqlValue>) -> DbResult<String> {
    if filter.is_empty() {
        return Ok(String::new());
    }
    let mut conditions = Vec::with_capacity(filter.len());
    for (column, value) in filter.conditions() {
        if value.is_null() {
            conditions.push(format!("{} IS NULL", quote_ident(column)));
        } else {
            bind_values.push(to_sql(value)?);
            conditions.push(format!("{} = ?", quote_ident(column)));
        }
    }
    Ok(format!(" WHERE {}", conditions.join(" AND ")))
}

fn set_clause(changes: &Record, bind_values: &mut Vec<SqlValue>) -> DbResult<String> {
    let mut assignments = Vec::with_capacity(changes.len());
    for (column, value) in changes {
        bind_values.push(to_sql(value)?);
        assignments.push(format!("{} = ?", quote_ident(column)));
    }
    Ok(assignments.join(", "))
}

fn read_records(
    stmt: &mut Statement<'_>,
    bind_values: Vec<SqlValue>,
) -> rusqlite::Result<Vec<Record>> {
    let columns = column_names(stmt);
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::new();
        for (index, column) in columns.iter().enumerate() {
            record.insert(column.clone(), from_sql(row.get_ref(index)?));
        }
        records.push(record);
    }
    Ok(records)
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn key_values(keys: &[RowKey]) -> Vec<SqlValue> {
    keys.iter().map(|key| SqlValue::Integer(*key)).collect()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
