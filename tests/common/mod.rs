//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
pub use strata_fixture::{
    Error, FieldSpec, FieldType, Fixture, FixtureConfig, FixtureOrchestrator, FixtureRegistry,
    FixtureState, IndexAdmin, IndexMode, IndexSpec, InstanceConfig, InstanceControl,
    InstanceHandle, MemoryStore, MultiFieldGroup, PollConfig, Store, StoreError, StoreResult,
    TermVector, TypeMapping,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (shown for failing tests).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Poll budget that keeps failing tests fast.
pub fn fast_poll() -> PollConfig {
    PollConfig::new().with_max_attempts(5).with_interval_ms(1)
}

// ============================================================================
// CountingStore - MemoryStore wrapper with call counters and fault injection
// ============================================================================

/// Counts every collaborator call and can be told to fail drops and stops.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub put_mappings: AtomicUsize,
    pub fail_delete: AtomicBool,
    pub fail_stop: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Instances answer "not ready" for the first `polls` probes.
    pub fn slow(polls: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new().with_startup_polls(polls),
            ..Self::default()
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn put_mappings(&self) -> usize {
        self.put_mappings.load(Ordering::SeqCst)
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn fail_stops(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }
}

impl InstanceControl for CountingStore {
    fn start(&self, config: &InstanceConfig) -> StoreResult<InstanceHandle> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.inner.start(config)
    }

    fn stop(&self, handle: &InstanceHandle) -> StoreResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("injected stop failure".into()));
        }
        self.inner.stop(handle)
    }

    fn is_ready(&self, handle: &InstanceHandle) -> StoreResult<bool> {
        self.inner.is_ready(handle)
    }
}

impl IndexAdmin for CountingStore {
    fn exists(&self, handle: &InstanceHandle, index: &str) -> StoreResult<bool> {
        self.inner.exists(handle, index)
    }

    fn create_index(
        &self,
        handle: &InstanceHandle,
        index: &str,
        settings: &Map<String, Value>,
    ) -> StoreResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_index(handle, index, settings)
    }

    fn put_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> StoreResult<()> {
        self.put_mappings.fetch_add(1, Ordering::SeqCst);
        self.inner.put_mapping(handle, index, type_name, mapping)
    }

    fn delete_index(&self, handle: &InstanceHandle, index: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("injected delete failure".into()));
        }
        self.inner.delete_index(handle, index)
    }

    fn get_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
    ) -> StoreResult<Option<Value>> {
        self.inner.get_mapping(handle, index, type_name)
    }
}

// ============================================================================
// Orchestrators
// ============================================================================

/// Exclusive-instance orchestrator with a private registry and fast polls.
pub fn orchestrator(store: &Arc<CountingStore>) -> FixtureOrchestrator {
    init_tracing();
    FixtureOrchestrator::builder()
        .backend(store.clone())
        .registry(Arc::new(FixtureRegistry::new()))
        .readiness(fast_poll())
        .propagation(fast_poll())
        .build()
        .expect("valid orchestrator")
}

// ============================================================================
// Specifications
// ============================================================================

/// The "library" index: `book` with full metadata and a multi-field group,
/// `rating` as its compressed child type.
pub fn library_spec() -> IndexSpec {
    IndexSpec::new("library")
        .mapping(
            TypeMapping::new("book")
                .source(false)
                .ttl("2d")
                .timestamp("YYYY-MM-dd", "publication_date")
                .field(FieldSpec::new("title", FieldType::String).stored())
                .field(FieldSpec::new("author", FieldType::String).not_analyzed())
                .field(
                    FieldSpec::new("description", FieldType::String)
                        .stored()
                        .analyzer("standard"),
                )
                .field(
                    FieldSpec::new("role", FieldType::String)
                        .index_analyzer("keyword")
                        .search_analyzer("standard"),
                )
                .field(FieldSpec::new("publication_date", FieldType::Date).not_analyzed())
                .multi_field(
                    MultiFieldGroup::new("name")
                        .field(
                            FieldSpec::new("name", FieldType::String)
                                .term_vector(TermVector::WithOffsets),
                        )
                        .field(
                            FieldSpec::new("untouched", FieldType::String)
                                .not_analyzed()
                                .term_vector(TermVector::WithPositionsOffsets),
                        ),
                ),
        )
        .mapping(
            TypeMapping::new("rating")
                .compress_threshold("10kb")
                .parent("book")
                .field(FieldSpec::new("stars", FieldType::Integer).not_analyzed()),
        )
}
