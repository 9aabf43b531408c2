//! PostgreSQL variants: single round trip through `RETURNING`.

use super::{validate_create, validate_update, Command, CommandInput, CommandKind, CommandResult};
use super::Specialization;
use crate::db::Dataset;
use crate::model::Record;
use log::debug;

const VARIANT: &str = "postgres";

pub const POSTGRES_CREATE: Specialization =
    Specialization::new(VARIANT, CommandKind::Create, build_create);

pub const POSTGRES_UPDATE: Specialization =
    Specialization::new(VARIANT, CommandKind::Update, build_update);

fn build_create() -> Box<dyn Command> {
    Box::new(PostgresCreate)
}

fn build_update() -> Box<dyn Command> {
    Box::new(PostgresUpdate)
}

/// `INSERT ... RETURNING *`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCreate;

impl Command for PostgresCreate {
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
        let stored = dataset.insert_returning(&input.record)?;
        debug!(
            "event=command_execute module=command kind=create variant={} dataset={} rows=1",
            VARIANT,
            dataset.name()
        );
        Ok(vec![stored])
    }
}

/// `UPDATE ... RETURNING *`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresUpdate;

impl Command for PostgresUpdate {
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
        let updated = dataset.update_returning(&input.filter, &input.record)?;
        debug!(
            "event=command_execute module=command kind=update variant={} dataset={} rows={}",
            VARIANT,
            dataset.name(),
            updated.len()
        );
        Ok(updated)
    }
}
