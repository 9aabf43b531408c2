use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabula_core::command::postgres::{POSTGRES_CREATE, POSTGRES_UPDATE};
use tabula_core::{
    CommandError, CommandKind, ConnectOptions, DataConnection, DatabaseType, DbError, Filter,
    QueryLogger, Record, RepoError, Repository, RepositoryConfig, SpecializationTable,
    SqliteConnection, StatementLog, AdapterRegistry,
};
use tempfile::TempDir;

const PEOPLE_SQL: &str = "
CREATE TABLE people (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER
);
";

fn fixture() -> (TempDir, PathBuf, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(PEOPLE_SQL).unwrap();
    drop(conn);
    let uri = uri_for(&path);
    (dir, path, uri)
}

fn uri_for(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

fn person(name: &str, age: Value) -> Record {
    let mut record = Record::new();
    record.insert("name".to_string(), json!(name));
    record.insert("age".to_string(), age);
    record
}

#[derive(Default)]
struct RecordingLogger {
    statements: Mutex<Vec<(String, String)>>,
}

impl QueryLogger for RecordingLogger {
    fn log_statement(&self, entry: &StatementLog<'_>) {
        self.statements
            .lock()
            .push((entry.dataset.to_string(), entry.statement.to_string()));
    }
}

#[test]
fn relation_crud_roundtrip() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    assert_eq!(repo.database_type(), &DatabaseType::Sqlite);
    assert!(repo.dataset_exists("people"));

    let people = repo.relation("people");
    assert!(!people.any().unwrap());

    let ada = people.create(person("ada", json!(36))).unwrap();
    assert_eq!(ada.get("id"), Some(&json!(1)));
    assert_eq!(ada.get("name"), Some(&json!("ada")));
    people.create(person("grace", json!(45))).unwrap();
    assert_eq!(people.count().unwrap(), 2);

    let updated = people
        .update(&Filter::eq("name", "ada"), person("ada", json!(37)))
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].get("age"), Some(&json!(37)));

    let found = people.find(&Filter::eq("age", 37)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(people.first().unwrap().unwrap().get("name"), Some(&json!("ada")));

    let deleted = people.delete(&Filter::eq("name", "ada")).unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].get("name"), Some(&json!("ada")));

    let names: Vec<Value> = people
        .iter()
        .unwrap()
        .filter_map(|row| row.get("name").cloned())
        .collect();
    assert_eq!(names, vec![json!("grace")]);
}

#[test]
fn null_filter_matches_null_column() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");
    people.create(person("anon", Value::Null)).unwrap();
    people.create(person("ada", json!(36))).unwrap();

    let unknown_age = people.find(&Filter::eq("age", Value::Null)).unwrap();
    assert_eq!(unknown_age.len(), 1);
    assert_eq!(unknown_age[0].get("name"), Some(&json!("anon")));
}

#[test]
fn empty_filter_delete_removes_every_row() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");
    people.create(person("ada", json!(36))).unwrap();
    people.create(person("grace", json!(45))).unwrap();

    let deleted = people.delete(&Filter::all()).unwrap();
    assert_eq!(deleted.len(), 2);
    assert_eq!(people.count().unwrap(), 0);
}

#[test]
fn sqlite_uses_generic_commands_by_default() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    let dataset = repo.dataset("people").unwrap();

    for kind in [CommandKind::Create, CommandKind::Update, CommandKind::Delete] {
        assert_eq!(repo.command(kind, dataset.as_ref()).variant(), "generic");
    }
}

#[test]
fn returning_variants_can_be_registered_for_sqlite() {
    let (_dir, _path, uri) = fixture();
    let mut table = SpecializationTable::default();
    table.register(DatabaseType::Sqlite, POSTGRES_CREATE);
    table.register(DatabaseType::Sqlite, POSTGRES_UPDATE);
    let repo = Repository::open(&uri).unwrap().with_specializations(table);

    let dataset = repo.dataset("people").unwrap();
    assert_eq!(
        repo.command(CommandKind::Create, dataset.as_ref()).variant(),
        "postgres"
    );
    assert_eq!(
        repo.command(CommandKind::Delete, dataset.as_ref()).variant(),
        "generic"
    );

    let people = repo.relation("people");
    let ada = people.create(person("ada", json!(36))).unwrap();
    assert_eq!(ada.get("id"), Some(&json!(1)));

    let updated = people
        .update(&Filter::eq("id", 1), person("ada", json!(40)))
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].get("age"), Some(&json!(40)));
}

#[test]
fn invalid_command_input_is_rejected_before_execution() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");

    let err = people.create(Record::new()).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Command(CommandError::InvalidInput {
            kind: CommandKind::Create,
            ..
        })
    ));
    assert_eq!(people.count().unwrap(), 0);
}

#[test]
fn schema_snapshot_is_not_refreshed_by_live_lookup() {
    let (_dir, path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();

    let other = Connection::open(&path).unwrap();
    other
        .execute_batch("CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT);")
        .unwrap();
    drop(other);

    assert!(!repo.dataset_exists("pets"));
    assert_eq!(repo.dataset("pets").unwrap().name(), "pets");

    let fresh = Repository::open(&uri).unwrap();
    assert!(fresh.dataset_exists("pets"));
}

#[test]
fn unknown_dataset_is_not_found() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();

    assert!(!repo.dataset_exists("ghost"));
    let err = repo.relation("ghost").all().unwrap_err();
    assert!(matches!(err, RepoError::DatasetNotFound(name) if name == "ghost"));
}

#[test]
fn missing_file_fails_unless_created() {
    let dir = tempfile::tempdir().unwrap();
    let uri = uri_for(&dir.path().join("missing.db"));

    let err = Repository::open(&uri).unwrap_err();
    assert!(matches!(err, RepoError::Connection(DbError::Sqlite(_))));

    let config = RepositoryConfig::new(uri.clone())
        .with_options(ConnectOptions::default().create_if_missing(true));
    let repo = Repository::from_config(&config, &AdapterRegistry::with_defaults()).unwrap();
    assert!(repo.schema().is_empty());
    assert!(dir.path().join("missing.db").exists());
}

#[test]
fn from_config_honours_explicit_adapter() {
    let (_dir, _path, uri) = fixture();
    let raw = json!({ "adapter": "sqlite", "uri": uri }).to_string();
    let config = RepositoryConfig::from_json_str(&raw).unwrap();

    let repo = Repository::from_config(&config, &AdapterRegistry::with_defaults()).unwrap();
    assert!(repo.owns_connection());
    assert!(repo.dataset_exists("people"));

    let unknown = config.clone().with_adapter("fmp");
    let err = Repository::from_config(&unknown, &AdapterRegistry::with_defaults()).unwrap_err();
    assert!(matches!(err, RepoError::Connection(DbError::Adapter(_))));
}

#[test]
fn shared_sqlite_connection_survives_repository_disconnect() {
    let (_dir, path, _uri) = fixture();
    let connection = Arc::new(SqliteConnection::from_rusqlite(
        Connection::open(&path).unwrap(),
    ));
    let shared: Arc<dyn DataConnection> = connection.clone();

    let mut repo = Repository::with_connection(shared).unwrap();
    repo.relation("people")
        .create(person("ada", json!(36)))
        .unwrap();
    repo.disconnect().unwrap();
    repo.disconnect().unwrap();

    assert!(connection.is_open());
    assert_eq!(connection.dataset("people").unwrap().count(&Filter::all()).unwrap(), 1);
}

#[test]
fn owned_connection_reconnects_with_logger() {
    let (_dir, _path, uri) = fixture();
    let mut repo = Repository::open(&uri).unwrap();
    let logger = Arc::new(RecordingLogger::default());
    repo.use_logger(logger.clone());

    repo.relation("people").all().unwrap();
    repo.disconnect().unwrap();
    assert!(matches!(
        repo.relation("people").all().unwrap_err(),
        RepoError::Disconnected
    ));

    repo.reconnect().unwrap();
    repo.relation("people").count().unwrap();

    let statements = logger.statements.lock().clone();
    let people: Vec<&(String, String)> = statements
        .iter()
        .filter(|(dataset, _)| dataset == "people")
        .collect();
    assert_eq!(people.len(), 2);
    assert!(people[0].1.starts_with("SELECT"));
    assert!(people[1].1.contains("COUNT"));
}

#[test]
fn bulk_update_and_delete_exceed_bound_variable_limit() {
    let (_dir, path, uri) = fixture();
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 40000)
         INSERT INTO people (name, age) SELECT 'p' || i, i FROM n;",
    )
    .unwrap();
    drop(conn);

    let repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");
    assert_eq!(people.count().unwrap(), 40_000);

    let mut changes = Record::new();
    changes.insert("age".to_string(), json!(1));
    let updated = people.update(&Filter::all(), changes).unwrap();
    assert_eq!(updated.len(), 40_000);
    assert_eq!(updated[0].get("name"), Some(&json!("p1")));
    assert_eq!(updated[39_999].get("name"), Some(&json!("p40000")));
    assert_eq!(people.find(&Filter::eq("age", 1)).unwrap().len(), 40_000);

    let deleted = people.delete(&Filter::all()).unwrap();
    assert_eq!(deleted.len(), 40_000);
    assert_eq!(people.count().unwrap(), 0);
}

#[test]
fn percent_encoded_uri_opens_path_with_spaces() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("my data");
    std::fs::create_dir(&nested).unwrap();
    let path = nested.join("app.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(PEOPLE_SQL)
        .unwrap();

    let encoded = format!("sqlite://{}", path.display()).replace(' ', "%20");
    let repo = Repository::open(&encoded).unwrap();
    assert!(repo.dataset_exists("people"));

    let spaced = Repository::open(&uri_for(&path)).unwrap();
    assert!(spaced.dataset_exists("people"));
}

#[test]
fn live_lookup_resolves_names_like_sqlite() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();

    assert!(!repo.dataset_exists("PEOPLE"));
    let dataset = repo.dataset("PEOPLE").unwrap();
    assert_eq!(dataset.name(), "people");

    repo.relation("People")
        .create(person("ada", json!(36)))
        .unwrap();
    assert_eq!(repo.relation("people").count().unwrap(), 1);
}

#[test]
fn first_reads_a_single_row() {
    let (_dir, _path, uri) = fixture();
    let mut repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");
    assert_eq!(people.first().unwrap(), None);
    people.create(person("ada", json!(36))).unwrap();
    people.create(person("grace", json!(45))).unwrap();

    let logger = Arc::new(RecordingLogger::default());
    repo.use_logger(logger.clone());
    let first = repo.relation("people").first().unwrap().unwrap();
    assert_eq!(first.get("name"), Some(&json!("ada")));

    let statements = logger.statements.lock().clone();
    assert!(statements
        .iter()
        .any(|(dataset, sql)| dataset == "people" && sql.ends_with("LIMIT 1")));
}

#[test]
fn out_of_range_integers_are_rejected() {
    let (_dir, _path, uri) = fixture();
    let repo = Repository::open(&uri).unwrap();
    let people = repo.relation("people");

    let err = people.create(person("big", json!(u64::MAX))).unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::InvalidData(_))));
    assert_eq!(people.count().unwrap(), 0);

    let err = people
        .find(&Filter::eq("age", json!(u64::MAX)))
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::InvalidData(_))));
}
