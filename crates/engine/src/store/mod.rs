//! Document store collaborators
//!
//! The fixture engine never talks to a store directly; it drives two traits:
//!
//! - [`InstanceControl`]: start, stop and probe a store instance
//! - [`IndexAdmin`]: create, inspect and drop indices and their mappings
//!
//! Anything implementing both is a [`StoreBackend`]. Two backends ship with
//! the crate:
//!
//! - [`MemoryStore`]: in-process, for tests that need no external engine
//! - `HttpStore` (feature `http`): attaches to a running store over REST

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use memory::MemoryStore;

#[cfg(feature = "http")]
pub use http::HttpStore;

use serde_json::{Map, Value};
use std::fmt;
use strata_fixture_core::{InstanceId, StoreResult};

use crate::fixture::config::InstanceConfig;

/// Reference to a running store instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    /// Unique id assigned at start
    pub id: InstanceId,
    /// Human-readable instance name
    pub name: String,
    /// Network endpoint, for backends that have one
    pub endpoint: Option<String>,
}

impl InstanceHandle {
    /// Create a handle with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(),
            name: name.into(),
            endpoint: None,
        }
    }

    /// Attach a network endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Instance lifecycle control
pub trait InstanceControl: Send + Sync {
    /// Start (or attach to) an instance
    fn start(&self, config: &InstanceConfig) -> StoreResult<InstanceHandle>;

    /// Stop an instance
    fn stop(&self, handle: &InstanceHandle) -> StoreResult<()>;

    /// Whether the instance accepts index administration requests
    fn is_ready(&self, handle: &InstanceHandle) -> StoreResult<bool>;
}

/// Index administration
pub trait IndexAdmin: Send + Sync {
    /// Whether the index exists
    fn exists(&self, handle: &InstanceHandle, index: &str) -> StoreResult<bool>;

    /// Create an index with the given settings
    fn create_index(
        &self,
        handle: &InstanceHandle,
        index: &str,
        settings: &Map<String, Value>,
    ) -> StoreResult<()>;

    /// Install the mapping document of one type
    fn put_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> StoreResult<()>;

    /// Drop an index
    fn delete_index(&self, handle: &InstanceHandle, index: &str) -> StoreResult<()>;

    /// Read back the mapping document of one type; None if the type has none
    fn get_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
    ) -> StoreResult<Option<Value>>;
}

/// A complete store backend
pub trait StoreBackend: InstanceControl + IndexAdmin {}

impl<T: InstanceControl + IndexAdmin + ?Sized> StoreBackend for T {}
