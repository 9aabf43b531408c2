//! (command kind, database type) -> specialization lookup.

use super::postgres::{POSTGRES_CREATE, POSTGRES_UPDATE};
use super::{CommandClass, CommandKind, Specialization};
use crate::db::DatabaseType;
use log::debug;
use std::collections::BTreeMap;

/// Strategy table consulted by `Repository::extend_command_class`.
///
/// `Default` registers the PostgreSQL create/update variants; every other
/// pair passes through.
#[derive(Debug, Clone)]
pub struct SpecializationTable {
    entries: BTreeMap<(CommandKind, DatabaseType), Specialization>,
}

impl Default for SpecializationTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(DatabaseType::Postgres, POSTGRES_CREATE);
        table.register(DatabaseType::Postgres, POSTGRES_UPDATE);
        table
    }
}

impl SpecializationTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers `specialization` for its kind on `database_type`.
    ///
    /// Returns the entry it replaced.
    pub fn register(
        &mut self,
        database_type: DatabaseType,
        specialization: Specialization,
    ) -> Option<Specialization> {
        self.entries
            .insert((specialization.kind(), database_type), specialization)
    }

    pub fn lookup(&self, kind: CommandKind, database_type: &DatabaseType) -> Option<Specialization> {
        self.entries.get(&(kind, database_type.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `class` specialized for `database_type`, or `class` unchanged
    /// when it is already specialized or no entry matches.
    pub fn extend(&self, class: CommandClass, database_type: &DatabaseType) -> CommandClass {
        if class.is_specialized() {
            return class;
        }
        match self.lookup(class.kind(), database_type) {
            Some(specialization) => {
                debug!(
                    "event=command_specialize module=command kind={} database_type={} variant={}",
                    class.kind(),
                    database_type,
                    specialization.name()
                );
                class.specialize(specialization)
            }
            None => class,
        }
    }
}
