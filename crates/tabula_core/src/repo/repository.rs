//! `Repository`: connection lifecycle, dataset lookup and command selection.

use super::schema::SchemaSnapshot;
use crate::command::{Command, CommandClass, CommandError, CommandKind, SpecializationTable};
use crate::config::{ConfigError, ConnectOptions, RepositoryConfig};
use crate::db::{
    AdapterRegistry, ConnectionProvider, ConnectionUri, DataConnection, Dataset, DatabaseType,
    DbError,
};
use crate::logging::QueryLogger;
use crate::relation::Relation;
use log::{error, info};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// The provider could not establish or reuse a connection.
    Connection(DbError),
    DatasetNotFound(String),
    /// The repository has been disconnected.
    Disconnected,
    Db(DbError),
    Command(CommandError),
    Config(ConfigError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "connection failed: {err}"),
            Self::DatasetNotFound(name) => write!(f, "dataset not found: {name}"),
            Self::Disconnected => write!(f, "repository is disconnected"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Command(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Db(err) => Some(err),
            Self::Command(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::DatasetNotFound(_) | Self::Disconnected => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::DatasetNotFound(name) => Self::DatasetNotFound(name),
            other => Self::Db(other),
        }
    }
}

impl From<CommandError> for RepoError {
    fn from(value: CommandError) -> Self {
        match value {
            CommandError::Db(err) => Self::from(err),
            other => Self::Command(other),
        }
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// What a repository connects to.
pub enum ConnectionSource {
    /// Open a new connection through the adapter registry.
    Uri(String),
    /// Reuse a live connection owned by the caller.
    Existing(Arc<dyn DataConnection>),
}

impl Debug for ConnectionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uri(uri) => f.debug_tuple("Uri").field(uri).finish(),
            Self::Existing(connection) => f
                .debug_tuple("Existing")
                .field(&connection.database_type())
                .finish(),
        }
    }
}

impl From<&str> for ConnectionSource {
    fn from(value: &str) -> Self {
        Self::Uri(value.to_string())
    }
}

impl From<String> for ConnectionSource {
    fn from(value: String) -> Self {
        Self::Uri(value)
    }
}

impl From<Arc<dyn DataConnection>> for ConnectionSource {
    fn from(value: Arc<dyn DataConnection>) -> Self {
        Self::Existing(value)
    }
}

/// How the held connection was obtained; decides ownership on disconnect.
enum Origin {
    Provider {
        uri: ConnectionUri,
        provider: Arc<dyn ConnectionProvider>,
        options: ConnectOptions,
    },
    External(Arc<dyn DataConnection>),
}

impl Origin {
    fn owns_connection(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

/// Facade over one data-source connection.
pub struct Repository {
    origin: Origin,
    connection: Option<Arc<dyn DataConnection>>,
    database_type: DatabaseType,
    schema: SchemaSnapshot,
    logger: Option<Arc<dyn QueryLogger>>,
    specializations: SpecializationTable,
}

impl Debug for Repository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("database_type", &self.database_type)
            .field("connected", &self.connection.is_some())
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Connects to `source`.
    ///
    /// A `ConnectionSource::Existing` handle is reused as-is; a URI is opened
    /// by the adapter whose scheme matches.
    ///
    /// # Errors
    /// - `RepoError::Connection` when the URI is invalid, no adapter matches,
    ///   the provider fails, the reused handle is closed or the schema cannot
    ///   be enumerated.
    pub fn connect(
        source: impl Into<ConnectionSource>,
        options: &ConnectOptions,
        adapters: &AdapterRegistry,
    ) -> RepoResult<Self> {
        Self::establish(source.into(), None, options, adapters)
    }

    /// Connects using declarative wiring; `config.adapter` overrides scheme
    /// matching.
    pub fn from_config(config: &RepositoryConfig, adapters: &AdapterRegistry) -> RepoResult<Self> {
        Self::establish(
            ConnectionSource::Uri(config.uri.clone()),
            config.adapter.as_deref(),
            &config.options,
            adapters,
        )
    }

    /// Opens `uri` with default options and the bundled adapters.
    pub fn open(uri: &str) -> RepoResult<Self> {
        Self::connect(uri, &ConnectOptions::default(), &AdapterRegistry::with_defaults())
    }

    /// Wraps a caller-owned connection.
    pub fn with_connection(connection: Arc<dyn DataConnection>) -> RepoResult<Self> {
        Self::connect(
            ConnectionSource::Existing(connection),
            &ConnectOptions::default(),
            &AdapterRegistry::new(),
        )
    }

    /// Replaces the command specialization table.
    pub fn with_specializations(mut self, specializations: SpecializationTable) -> Self {
        self.specializations = specializations;
        self
    }

    fn establish(
        source: ConnectionSource,
        adapter_id: Option<&str>,
        options: &ConnectOptions,
        adapters: &AdapterRegistry,
    ) -> RepoResult<Self> {
        let started_at = Instant::now();
        let reused = matches!(source, ConnectionSource::Existing(_));
        let result = Self::establish_inner(source, adapter_id, options, adapters);

        match &result {
            Ok(repository) => info!(
                "event=repo_connect module=repo status=ok reused={} database_type={} datasets={} duration_ms={}",
                reused,
                repository.database_type,
                repository.schema.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=repo_connect module=repo status=error reused={} duration_ms={} error={}",
                reused,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn establish_inner(
        source: ConnectionSource,
        adapter_id: Option<&str>,
        options: &ConnectOptions,
        adapters: &AdapterRegistry,
    ) -> RepoResult<Self> {
        let (origin, connection) = match source {
            ConnectionSource::Uri(raw) => {
                let uri = ConnectionUri::parse(&raw).map_err(RepoError::Connection)?;
                let provider = adapters
                    .resolve(&uri, adapter_id)
                    .map_err(|err| RepoError::Connection(err.into()))?;
                let connection = provider
                    .connect(&uri, options)
                    .map_err(RepoError::Connection)?;
                let origin = Origin::Provider {
                    uri,
                    provider,
                    options: options.clone(),
                };
                (origin, connection)
            }
            ConnectionSource::Existing(connection) => {
                if !connection.is_open() {
                    return Err(RepoError::Connection(DbError::Closed));
                }
                (Origin::External(Arc::clone(&connection)), connection)
            }
        };

        let schema = match SchemaSnapshot::capture(connection.as_ref()) {
            Ok(schema) => schema,
            Err(err) => {
                if origin.owns_connection() {
                    if let Err(close_err) = connection.disconnect() {
                        error!(
                            "event=repo_connect module=repo status=error stage=cleanup error={}",
                            close_err
                        );
                    }
                }
                return Err(RepoError::Connection(err));
            }
        };

        Ok(Self {
            origin,
            database_type: connection.database_type(),
            connection: Some(connection),
            schema,
            logger: None,
            specializations: SpecializationTable::default(),
        })
    }

    /// Releases the held connection.
    ///
    /// Owned connections are closed; caller-supplied ones are only dropped.
    /// Calling this again is a no-op.
    pub fn disconnect(&mut self) -> RepoResult<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        let owned = self.origin.owns_connection();
        if owned {
            connection.disconnect()?;
        }
        info!("event=repo_disconnect module=repo status=ok owned={owned}");
        Ok(())
    }

    /// Re-establishes the connection from the source it was built from.
    ///
    /// The schema snapshot is kept as captured at construction; an attached
    /// logger is re-applied.
    pub fn reconnect(&mut self) -> RepoResult<()> {
        self.disconnect()?;
        let connection = match &self.origin {
            Origin::Provider {
                uri,
                provider,
                options,
            } => provider
                .connect(uri, options)
                .map_err(RepoError::Connection)?,
            Origin::External(connection) => {
                if !connection.is_open() {
                    return Err(RepoError::Connection(DbError::Closed));
                }
                Arc::clone(connection)
            }
        };
        if let Some(logger) = &self.logger {
            connection.set_logger(Arc::clone(logger));
        }
        self.connection = Some(connection);
        info!("event=repo_reconnect module=repo status=ok");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Whether the repository closes the connection on `disconnect`.
    pub fn owns_connection(&self) -> bool {
        self.origin.owns_connection()
    }

    /// Database type reported by the connection at construction.
    pub fn database_type(&self) -> &DatabaseType {
        &self.database_type
    }

    pub fn schema(&self) -> &SchemaSnapshot {
        &self.schema
    }

    /// Snapshot membership; does not contact the source.
    pub fn dataset_exists(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Live dataset handle; the snapshot is not consulted.
    ///
    /// # Errors
    /// - `RepoError::DatasetNotFound` when the source cannot resolve `name`.
    /// - `RepoError::Disconnected` after `disconnect`.
    pub fn dataset(&self, name: &str) -> RepoResult<Arc<dyn Dataset>> {
        let connection = self.connection.as_ref().ok_or(RepoError::Disconnected)?;
        Ok(connection.dataset(name)?)
    }

    /// Routes statement logging of all later operations to `logger`.
    pub fn use_logger(&mut self, logger: Arc<dyn QueryLogger>) {
        if let Some(connection) = &self.connection {
            connection.set_logger(Arc::clone(&logger));
        }
        self.logger = Some(logger);
    }

    pub fn logger(&self) -> Option<&Arc<dyn QueryLogger>> {
        self.logger.as_ref()
    }

    pub fn specializations(&self) -> &SpecializationTable {
        &self.specializations
    }

    /// Specializes `class` for the database type behind `dataset`.
    ///
    /// Returns `class` unchanged when no specialization is registered or it
    /// is already specialized.
    pub fn extend_command_class(&self, class: CommandClass, dataset: &dyn Dataset) -> CommandClass {
        self.specializations
            .extend(class, &dataset.database_type())
    }

    /// Command behavior of `kind` for `dataset`.
    pub fn command(&self, kind: CommandKind, dataset: &dyn Dataset) -> Box<dyn Command> {
        self.extend_command_class(CommandClass::new(kind), dataset)
            .build()
    }

    /// Relation over the dataset `name`; resolution happens per operation.
    pub fn relation(&self, name: &str) -> Relation<'_> {
        Relation::new(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;
    use crate::command::{CommandError, CommandKind};
    use crate::db::DbError;

    #[test]
    fn dataset_not_found_is_lifted_from_provider_errors() {
        let err = RepoError::from(DbError::DatasetNotFound("ghost".to_string()));
        assert!(matches!(err, RepoError::DatasetNotFound(name) if name == "ghost"));

        let nested = RepoError::from(CommandError::Db(DbError::DatasetNotFound(
            "ghost".to_string(),
        )));
        assert!(matches!(nested, RepoError::DatasetNotFound(_)));
    }

    #[test]
    fn other_errors_keep_their_layer() {
        assert!(matches!(RepoError::from(DbError::Closed), RepoError::Db(_)));
        let invalid = CommandError::InvalidInput {
            kind: CommandKind::Create,
            message: "empty".to_string(),
        };
        assert!(matches!(RepoError::from(invalid), RepoError::Command(_)));
        assert_eq!(
            RepoError::Disconnected.to_string(),
            "repository is disconnected"
        );
    }
}
