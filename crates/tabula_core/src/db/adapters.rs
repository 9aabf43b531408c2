//! Named connection-provider registry.
//!
//! Replaces process-wide adapter declarations with an explicit value that is
//! handed to `Repository::connect`.

use super::sqlite::SqliteProvider;
use super::{ConnectionProvider, ConnectionUri};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterRegistryError {
    InvalidAdapterId(String),
    DuplicateAdapterId(String),
    AdapterNotFound(String),
    NoAdapterForScheme(String),
}

impl Display for AdapterRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAdapterId(value) => write!(f, "adapter id is invalid: {value}"),
            Self::DuplicateAdapterId(value) => {
                write!(f, "adapter id already registered: {value}")
            }
            Self::AdapterNotFound(value) => write!(f, "adapter not found: {value}"),
            Self::NoAdapterForScheme(value) => {
                write!(f, "no adapter registered for uri scheme: {value}")
            }
        }
    }
}

impl Error for AdapterRegistryError {}

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn ConnectionProvider>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled `sqlite` adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.adapters.insert(
            SqliteProvider::ADAPTER_ID.to_string(),
            Arc::new(SqliteProvider),
        );
        registry
    }

    pub fn register(
        &mut self,
        adapter: Arc<dyn ConnectionProvider>,
    ) -> Result<(), AdapterRegistryError> {
        let adapter_id = adapter.adapter_id().trim().to_string();
        if !is_valid_adapter_id(&adapter_id) {
            return Err(AdapterRegistryError::InvalidAdapterId(adapter_id));
        }
        if self.adapters.contains_key(adapter_id.as_str()) {
            return Err(AdapterRegistryError::DuplicateAdapterId(adapter_id));
        }

        self.adapters.insert(adapter_id, adapter);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Sorted adapter ids.
    pub fn adapter_ids(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    pub fn get(&self, adapter_id: &str) -> Option<Arc<dyn ConnectionProvider>> {
        self.adapters.get(adapter_id.trim()).cloned()
    }

    /// Picks the adapter for `uri`.
    ///
    /// An explicit `adapter_id` wins; otherwise the first adapter (by id) that
    /// supports the URI scheme is used.
    pub fn resolve(
        &self,
        uri: &ConnectionUri,
        adapter_id: Option<&str>,
    ) -> Result<Arc<dyn ConnectionProvider>, AdapterRegistryError> {
        if let Some(adapter_id) = adapter_id {
            return self
                .get(adapter_id)
                .ok_or_else(|| AdapterRegistryError::AdapterNotFound(adapter_id.trim().to_string()));
        }

        self.adapters
            .values()
            .find(|adapter| adapter.supports_scheme(uri.scheme()))
            .cloned()
            .ok_or_else(|| AdapterRegistryError::NoAdapterForScheme(uri.scheme().to_string()))
    }
}

fn is_valid_adapter_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
