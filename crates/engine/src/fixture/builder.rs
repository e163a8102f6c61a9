//! Fixture builder for fluent configuration
//!
//! Provides a builder pattern for configuring an orchestrator in code instead
//! of through `fixture.toml`.

use serde_json::Value;
use std::sync::Arc;
use strata_fixture_core::{Error, IndexSpec, Result};

use super::config::{FixtureConfig, InstancePolicy};
use super::orchestrator::FixtureOrchestrator;
use super::poll::PollConfig;
use super::registry::FixtureRegistry;
use crate::store::{MemoryStore, StoreBackend};

// ============================================================================
// Fixture Builder Pattern
// ============================================================================

/// Builder for FixtureOrchestrator configuration
///
/// ```ignore
/// use strata_fixture_engine::FixtureOrchestrator;
///
/// // Exclusive in-memory instance, one index
/// let orchestrator = FixtureOrchestrator::builder()
///     .memory()
///     .index(library_spec())
///     .build()?;
///
/// // Shared instance reused across tests
/// let orchestrator = FixtureOrchestrator::builder()
///     .backend(Arc::new(HttpStore::new("http://localhost:9200")))
///     .shared("suite")
///     .force_recreate()
///     .build()?;
/// ```
#[derive(Clone)]
pub struct FixtureBuilder {
    /// Store backend (required for build())
    backend: Option<Arc<dyn StoreBackend>>,
    /// Registry; the global one if unset
    registry: Option<Arc<FixtureRegistry>>,
    config: FixtureConfig,
}

impl std::fmt::Debug for FixtureBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureBuilder")
            .field("backend", &self.backend.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl FixtureBuilder {
    /// Create new builder with the default configuration
    pub fn new() -> Self {
        Self {
            backend: None,
            registry: None,
            config: FixtureConfig::default(),
        }
    }

    /// Set the store backend
    pub fn backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a fresh in-process [`MemoryStore`]
    pub fn memory(self) -> Self {
        self.backend(Arc::new(MemoryStore::new()))
    }

    /// Use a private registry instead of the global one
    pub fn registry(mut self, registry: Arc<FixtureRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the whole configuration (e.g. one loaded from `fixture.toml`)
    pub fn config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Lease the shared instance `name` instead of starting a fresh one
    pub fn shared(mut self, name: impl Into<String>) -> Self {
        self.config.instance.policy = InstancePolicy::Shared;
        self.config.instance.name = Some(name.into());
        self
    }

    /// Start a fresh instance per fixture (default)
    pub fn exclusive(mut self) -> Self {
        self.config.instance.policy = InstancePolicy::Exclusive;
        self
    }

    /// Pass a start setting to the backend
    pub fn instance_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.instance.settings.insert(key.into(), value.into());
        self
    }

    /// Drop and recreate indices that already exist
    pub fn force_recreate(mut self) -> Self {
        self.config.force_recreate = true;
        self
    }

    /// Readiness budget
    pub fn readiness(mut self, readiness: PollConfig) -> Self {
        self.config.readiness = readiness;
        self
    }

    /// Index propagation budget
    pub fn propagation(mut self, propagation: PollConfig) -> Self {
        self.config.propagation = propagation;
        self
    }

    /// Report teardown failures as errors even after a passing body
    pub fn strict_teardown(mut self) -> Self {
        self.config.strict_teardown = true;
        self
    }

    /// Skip mapping verification during setup
    pub fn skip_verify(mut self) -> Self {
        self.config.verify = false;
        self
    }

    /// Add an index installed by `run_configured`
    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.config.indices.push(spec);
        self
    }

    /// Validate the configuration and build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No backend was configured (use `.backend()` or `.memory()`)
    /// - A poll budget is zero or a declared index does not compile
    pub fn build(self) -> Result<FixtureOrchestrator> {
        let backend = self.backend.ok_or_else(|| {
            Error::Config(
                "FixtureBuilder::build() requires a backend. Use .memory() for an in-process store."
                    .to_string(),
            )
        })?;
        self.config.validate()?;

        let registry = self.registry.unwrap_or_else(FixtureRegistry::global);
        Ok(FixtureOrchestrator::new(backend)
            .with_registry(registry)
            .with_config(self.config))
    }
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
