//! Repository facade over one data-source connection.
//!
//! # Responsibility
//! - Own (or borrow) the connection and its lifecycle.
//! - Capture the schema snapshot once and answer existence checks from it.
//! - Serve live dataset handles and pick command behavior per database type.
//!
//! # Invariants
//! - `dataset_exists` consults only the snapshot; `dataset` always asks the
//!   live connection.
//! - `disconnect` is idempotent and never closes a caller-supplied connection.
//! - No operation retries a failed provider call.

mod repository;
mod schema;

pub use repository::{ConnectionSource, RepoError, RepoResult, Repository};
pub use schema::SchemaSnapshot;
