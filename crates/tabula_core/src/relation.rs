//! Relation: query-facing view over one dataset.
//!
//! # Responsibility
//! - Forward reads to the live dataset and writes to the command selected by
//!   the repository.
//!
//! # Invariants
//! - Holds no state beyond the repository reference and dataset name; every
//!   call resolves the dataset again.

use crate::command::{CommandInput, CommandKind};
use crate::db::{Dataset, DbError};
use crate::model::{Filter, Record};
use crate::repo::{RepoError, RepoResult, Repository};
use std::sync::Arc;

pub struct Relation<'repo> {
    repo: &'repo Repository,
    name: String,
}

impl<'repo> Relation<'repo> {
    pub fn new(repo: &'repo Repository, name: impl Into<String>) -> Self {
        Self {
            repo,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dataset(&self) -> RepoResult<Arc<dyn Dataset>> {
        self.repo.dataset(&self.name)
    }

    /// Rows matching `filter`.
    pub fn find(&self, filter: &Filter) -> RepoResult<Vec<Record>> {
        Ok(self.dataset()?.select(filter)?)
    }

    pub fn all(&self) -> RepoResult<Vec<Record>> {
        self.find(&Filter::all())
    }

    /// First row in provider order; the provider bounds the read.
    pub fn first(&self) -> RepoResult<Option<Record>> {
        Ok(self.dataset()?.select_first(&Filter::all())?)
    }

    /// Whether the dataset has at least one row.
    pub fn any(&self) -> RepoResult<bool> {
        Ok(self.count()? > 0)
    }

    pub fn count(&self) -> RepoResult<u64> {
        Ok(self.dataset()?.count(&Filter::all())?)
    }

    /// Inserts `record` and returns the row as stored.
    pub fn create(&self, record: Record) -> RepoResult<Record> {
        let mut rows = self.dispatch(CommandKind::Create, CommandInput::create(record))?;
        rows.pop().ok_or_else(|| {
            RepoError::Db(DbError::InvalidData(format!(
                "create on `{}` returned no row",
                self.name
            )))
        })
    }

    /// Applies `changes` to rows matching `filter`; returns them as stored.
    pub fn update(&self, filter: &Filter, changes: Record) -> RepoResult<Vec<Record>> {
        self.dispatch(
            CommandKind::Update,
            CommandInput::update(filter.clone(), changes),
        )
    }

    /// Deletes rows matching `filter`; returns the deleted rows.
    pub fn delete(&self, filter: &Filter) -> RepoResult<Vec<Record>> {
        self.dispatch(CommandKind::Delete, CommandInput::delete(filter.clone()))
    }

    /// Iterates the rows of `all()`.
    pub fn iter(&self) -> RepoResult<std::vec::IntoIter<Record>> {
        Ok(self.all()?.into_iter())
    }

    fn dispatch(&self, kind: CommandKind, input: CommandInput) -> RepoResult<Vec<Record>> {
        let dataset = self.dataset()?;
        let command = self.repo.command(kind, dataset.as_ref());
        Ok(command.call(dataset.as_ref(), &input)?)
    }
}
