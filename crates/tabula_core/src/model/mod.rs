//! Provider-neutral row model shared by datasets, commands and relations.
//!
//! # Responsibility
//! - Define the record shape exchanged with every connection provider.
//! - Define equality filters used to restrict dataset operations.
//!
//! # Invariants
//! - Column names are compared case-sensitively.
//! - An empty `Filter` matches every row of a dataset.

pub mod record;

pub use record::{Filter, Record, RowKey};
