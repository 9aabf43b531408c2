//! Statement-level logging hook.

use log::debug;
use std::time::Duration;

/// One statement executed by a provider on behalf of a dataset.
#[derive(Debug, Clone, Copy)]
pub struct StatementLog<'a> {
    pub dataset: &'a str,
    pub statement: &'a str,
    pub duration: Duration,
    pub ok: bool,
}

/// Receives every statement a connection executes.
///
/// Attached through `Repository::use_logger`; shared, never owned by the
/// connection.
pub trait QueryLogger: Send + Sync {
    fn log_statement(&self, entry: &StatementLog<'_>);
}

/// Forwards statements to the `log` facade at debug level.
#[derive(Debug, Clone, Default)]
pub struct LogQueryLogger;

impl QueryLogger for LogQueryLogger {
    fn log_statement(&self, entry: &StatementLog<'_>) {
        debug!(
            "event=statement module=db status={} dataset={} duration_ms={} sql={}",
            if entry.ok { "ok" } else { "error" },
            entry.dataset,
            entry.duration.as_millis(),
            single_line(entry.statement)
        );
    }
}

fn single_line(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}
