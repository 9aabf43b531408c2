//! Portable command behavior built only on key-based dataset operations.

use super::{validate_create, validate_update, Command, CommandInput, CommandKind, CommandResult};
use crate::db::{Dataset, DbError};
use crate::model::Record;
use log::debug;

const VARIANT: &str = "generic";

/// Inserts, then re-reads the stored row by its key.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericCreate;

impl Command for GenericCreate {
    fn kind(&self) -> CommandKind {
        CommandKind::Create
    }

    fn variant(&self) -> &'static str {
        VARIANT
    }

    fn validate(&self, input: &CommandInput) -> CommandResult<()> {
        validate_create(input)
    }

    fn execute(&self, dataset: &dyn Dataset, input: &CommandInput) -> CommandResult<Vec<Record>> {
        let key = dataset.insert(&input.record)?;
        let stored = dataset.fetch(&[key])?;
        if stored.is_empty() {
            return Err(DbError::InvalidData(format!(
                "row {key} inserted into `{}` could not be read back",
                dataset.name()
            ))
            .into());
        }
        debug!(
            "event=command_execute module=command kind=create variant={} dataset={} rows=1",
            VARIANT,
            dataset.name()
        );
        Ok(stored)
    }
}

/// Resolves matching keys, updates them, then re-reads them.
///
/// Keys are captured before the update so rows whose filtered columns change
/// are still returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericUpdate;

impl Command for GenericUpdate {
    fn kind(&self) -> CommandKind {
        CommandKind::Update
    }

    fn variant(&self) -> &'static str {
        VARIANT
    }

    fn validate(&self, input: &CommandInput) -> CommandResult<()> {
        validate_update(input)
    }

    fn execute(&self, dataset: &dyn Dataset, input: &CommandInput) -> CommandResult<Vec<Record>> {
        let keys = dataset.keys(&input.filter)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        dataset.update_keys(&keys, &input.record)?;
        let updated = dataset.fetch(&keys)?;
        debug!(
            "event=command_execute module=command kind=update variant={} dataset={} rows={}",
            VARIANT,
            dataset.name(),
            updated.len()
        );
        Ok(updated)
    }
}

/// Reads matching rows, deletes them by key and returns what was deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDelete;

impl Command for GenericDelete {
    fn kind(&self) -> CommandKind {
        CommandKind::Delete
    }

    fn variant(&self) -> &'static str {
        VARIANT
    }

    fn validate(&self, _input: &CommandInput) -> CommandResult<()> {
        Ok(())
    }

    fn execute(&self, dataset: &dyn Dataset, input: &CommandInput) -> CommandResult<Vec<Record>> {
        let keys = dataset.keys(&input.filter)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let deleted = dataset.fetch(&keys)?;
        dataset.delete_keys(&keys)?;
        debug!(
            "event=command_execute module=command kind=delete variant={} dataset={} rows={}",
            VARIANT,
            dataset.name(),
            deleted.len()
        );
        Ok(deleted)
    }
}
