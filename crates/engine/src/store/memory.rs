//! In-process store backend
//!
//! `MemoryStore` keeps every instance and index in memory. It stores mapping
//! documents verbatim and echoes them back from `get_mapping`, which makes it
//! a faithful oracle for the schema compiler. Startup latency can be
//! simulated with [`MemoryStore::with_startup_polls`] to exercise readiness
//! polling.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_fixture_core::{InstanceId, StoreError, StoreResult};
use tracing::info;

use super::{IndexAdmin, InstanceControl, InstanceHandle};
use crate::fixture::config::InstanceConfig;

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: Map<String, Value>,
    mappings: Map<String, Value>,
}

#[derive(Debug)]
struct MemoryInstance {
    /// `is_ready` calls left that answer false
    pending_ready_polls: u32,
    indices: BTreeMap<String, MemoryIndex>,
}

/// In-memory implementation of [`InstanceControl`] and [`IndexAdmin`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    instances: DashMap<InstanceId, Arc<RwLock<MemoryInstance>>>,
    startup_polls: u32,
}

impl MemoryStore {
    /// Create a store whose instances are ready immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every new instance answer `is_ready == false` for the first `polls` probes
    pub fn with_startup_polls(mut self, polls: u32) -> Self {
        self.startup_polls = polls;
        self
    }

    /// Number of instances currently running
    pub fn running_instances(&self) -> usize {
        self.instances.len()
    }

    /// Index names on an instance, sorted
    pub fn index_names(&self, handle: &InstanceHandle) -> StoreResult<Vec<String>> {
        let instance = self.running(handle)?;
        let guard = instance.read();
        Ok(guard.indices.keys().cloned().collect())
    }

    /// Settings an index was created with
    pub fn index_settings(
        &self,
        handle: &InstanceHandle,
        index: &str,
    ) -> StoreResult<Map<String, Value>> {
        let instance = self.running(handle)?;
        let guard = instance.read();
        guard
            .indices
            .get(index)
            .map(|i| i.settings.clone())
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))
    }

    fn running(&self, handle: &InstanceHandle) -> StoreResult<Arc<RwLock<MemoryInstance>>> {
        self.instances
            .get(&handle.id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::InstanceNotRunning(handle.to_string()))
    }
}

impl InstanceControl for MemoryStore {
    fn start(&self, config: &InstanceConfig) -> StoreResult<InstanceHandle> {
        let name = config.name.clone().unwrap_or_else(|| "memory".to_string());
        let handle = InstanceHandle::new(name);
        self.instances.insert(
            handle.id,
            Arc::new(RwLock::new(MemoryInstance {
                pending_ready_polls: self.startup_polls,
                indices: BTreeMap::new(),
            })),
        );
        info!(target: "strata::memory", instance = %handle, "Started in-memory instance");
        Ok(handle)
    }

    fn stop(&self, handle: &InstanceHandle) -> StoreResult<()> {
        // Stopped instances are forgotten; a handle kept past stop sees InstanceNotRunning
        let (_, instance) = self
            .instances
            .remove(&handle.id)
            .ok_or_else(|| StoreError::InstanceNotRunning(handle.to_string()))?;
        instance.write().indices.clear();
        info!(target: "strata::memory", instance = %handle, "Stopped in-memory instance");
        Ok(())
    }

    fn is_ready(&self, handle: &InstanceHandle) -> StoreResult<bool> {
        let instance = self.running(handle)?;
        let mut guard = instance.write();
        if guard.pending_ready_polls > 0 {
            guard.pending_ready_polls -= 1;
            return Ok(false);
        }
        Ok(true)
    }
}

impl IndexAdmin for MemoryStore {
    fn exists(&self, handle: &InstanceHandle, index: &str) -> StoreResult<bool> {
        let instance = self.running(handle)?;
        let exists = instance.read().indices.contains_key(index);
        Ok(exists)
    }

    fn create_index(
        &self,
        handle: &InstanceHandle,
        index: &str,
        settings: &Map<String, Value>,
    ) -> StoreResult<()> {
        let instance = self.running(handle)?;
        let mut guard = instance.write();
        if guard.indices.contains_key(index) {
            return Err(StoreError::IndexExists(index.to_string()));
        }
        guard.indices.insert(
            index.to_string(),
            MemoryIndex {
                settings: settings.clone(),
                mappings: Map::new(),
            },
        );
        Ok(())
    }

    fn put_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> StoreResult<()> {
        if !mapping.is_object() {
            return Err(StoreError::Rejected(format!(
                "mapping for '{}/{}' must be an object",
                index, type_name
            )));
        }
        let instance = self.running(handle)?;
        let mut guard = instance.write();
        let target = guard
            .indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        target.mappings.insert(type_name.to_string(), mapping.clone());
        Ok(())
    }

    fn delete_index(&self, handle: &InstanceHandle, index: &str) -> StoreResult<()> {
        let instance = self.running(handle)?;
        let removed = instance.write().indices.remove(index);
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::IndexNotFound(index.to_string())),
        }
    }

    fn get_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
    ) -> StoreResult<Option<Value>> {
        let instance = self.running(handle)?;
        let guard = instance.read();
        let target = guard
            .indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        Ok(target.mappings.get(type_name).cloned())
    }
}
