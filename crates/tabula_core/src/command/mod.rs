//! Mutating commands and database-specific specialization.
//!
//! # Responsibility
//! - Define the `Command` interface (`validate` + `execute`) shared by every
//!   variant.
//! - Describe commands as `CommandClass` values that can be specialized once
//!   for the database type of the dataset they will run against.
//!
//! # Invariants
//! - A `CommandClass` carries at most one specialization; specializing an
//!   already specialized class is a no-op.
//! - Specialization lookup never fails; unknown pairs pass through.
//! - Specialized variants enforce the same validation as the generic variant
//!   of their kind.

use crate::db::{Dataset, DbError};
use crate::model::{Filter, Record};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod generic;
pub mod postgres;
mod specializer;

pub use generic::{GenericCreate, GenericDelete, GenericUpdate};
pub use postgres::{PostgresCreate, PostgresUpdate};
pub use specializer::SpecializationTable;

pub type CommandResult<T> = Result<T, CommandError>;

/// Base behavior of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandKind {
    Create,
    Update,
    Delete,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of one command invocation.
///
/// `record` is the new row for create and the change set for update; delete
/// ignores it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandInput {
    pub filter: Filter,
    pub record: Record,
}

impl CommandInput {
    pub fn create(record: Record) -> Self {
        Self {
            filter: Filter::all(),
            record,
        }
    }

    pub fn update(filter: Filter, changes: Record) -> Self {
        Self {
            filter,
            record: changes,
        }
    }

    pub fn delete(filter: Filter) -> Self {
        Self {
            filter,
            record: Record::new(),
        }
    }
}

#[derive(Debug)]
pub enum CommandError {
    InvalidInput {
        kind: CommandKind,
        message: String,
    },
    Db(DbError),
}

impl CommandError {
    fn invalid(kind: CommandKind, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            kind,
            message: message.into(),
        }
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput { kind, message } => {
                write!(f, "invalid {kind} command input: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput { .. } => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for CommandError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Executable command behavior.
pub trait Command: Send + Sync {
    fn kind(&self) -> CommandKind;

    /// Variant name, e.g. `generic` or `postgres`.
    fn variant(&self) -> &'static str;

    fn validate(&self, input: &CommandInput) -> CommandResult<()>;

    /// Runs the command and returns the affected rows as stored.
    fn execute(&self, dataset: &dyn Dataset, input: &CommandInput) -> CommandResult<Vec<Record>>;

    /// `validate` followed by `execute`.
    fn call(&self, dataset: &dyn Dataset, input: &CommandInput) -> CommandResult<Vec<Record>> {
        self.validate(input)?;
        self.execute(dataset, input)
    }
}

/// Database-specific replacement for the generic behavior of one kind.
#[derive(Clone, Copy)]
pub struct Specialization {
    name: &'static str,
    kind: CommandKind,
    build: fn() -> Box<dyn Command>,
}

impl Specialization {
    pub const fn new(name: &'static str, kind: CommandKind, build: fn() -> Box<dyn Command>) -> Self {
        Self { name, kind, build }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

impl std::fmt::Debug for Specialization {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specialization")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for Specialization {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for Specialization {}

/// Descriptor of a command: base kind plus optional specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandClass {
    kind: CommandKind,
    specialization: Option<Specialization>,
}

impl CommandClass {
    pub const fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            specialization: None,
        }
    }

    pub const fn create() -> Self {
        Self::new(CommandKind::Create)
    }

    pub const fn update() -> Self {
        Self::new(CommandKind::Update)
    }

    pub const fn delete() -> Self {
        Self::new(CommandKind::Delete)
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn specialization(&self) -> Option<Specialization> {
        self.specialization
    }

    pub fn is_specialized(&self) -> bool {
        self.specialization.is_some()
    }

    /// Applies `specialization` unless the class is already specialized or
    /// the kinds differ.
    pub fn specialize(self, specialization: Specialization) -> Self {
        if self.is_specialized() || specialization.kind != self.kind {
            return self;
        }
        Self {
            kind: self.kind,
            specialization: Some(specialization),
        }
    }

    /// Instantiates the behavior this class describes.
    pub fn build(&self) -> Box<dyn Command> {
        if let Some(specialization) = self.specialization {
            return (specialization.build)();
        }
        match self.kind {
            CommandKind::Create => Box::new(GenericCreate),
            CommandKind::Update => Box::new(GenericUpdate),
            CommandKind::Delete => Box::new(GenericDelete),
        }
    }
}

pub(crate) fn validate_create(input: &CommandInput) -> CommandResult<()> {
    if input.record.is_empty() {
        return Err(CommandError::invalid(
            CommandKind::Create,
            "record must contain at least one column",
        ));
    }
    if !input.filter.is_empty() {
        return Err(CommandError::invalid(
            CommandKind::Create,
            "create does not accept a filter",
        ));
    }
    Ok(())
}

pub(crate) fn validate_update(input: &CommandInput) -> CommandResult<()> {
    if input.record.is_empty() {
        return Err(CommandError::invalid(
            CommandKind::Update,
            "change set must contain at least one column",
        ));
    }
    Ok(())
}
