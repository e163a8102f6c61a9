//! Scoped fixture acquisition
//!
//! `FixtureOrchestrator::run` is the usual entry point for a test:
//!
//! ```ignore
//! let orchestrator = FixtureOrchestrator::builder().memory().build()?;
//! orchestrator.run(&[library_spec()], |fixture| {
//!     assert!(fixture.index_exists("library")?);
//!     Ok::<_, strata_fixture_core::Error>(())
//! })?;
//! ```
//!
//! Setup compiles every spec before touching the store, then acquires the
//! instance, installs each index and (unless disabled) verifies the result.
//! Teardown runs on every exit path: after the body returns, after a setup
//! failure, and through `Drop` when the body panics.

use std::sync::Arc;
use strata_fixture_core::{Error, IndexSpec, Result};
use strata_fixture_schema::compile_index;
use tracing::{debug, warn};

use super::builder::FixtureBuilder;
use super::config::FixtureConfig;
use super::registry::FixtureRegistry;
use super::Fixture;
use crate::store::StoreBackend;

/// Creates fixtures against one backend with one configuration
#[derive(Clone)]
pub struct FixtureOrchestrator {
    backend: Arc<dyn StoreBackend>,
    registry: Arc<FixtureRegistry>,
    config: FixtureConfig,
}

impl std::fmt::Debug for FixtureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureOrchestrator")
            .field("config", &self.config)
            .finish()
    }
}

impl FixtureOrchestrator {
    /// Orchestrator with the default configuration and the global registry
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            registry: FixtureRegistry::global(),
            config: FixtureConfig::default(),
        }
    }

    /// Fluent configuration
    pub fn builder() -> FixtureBuilder {
        FixtureBuilder::new()
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the registry
    pub fn with_registry(mut self, registry: Arc<FixtureRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Configuration in effect
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Registry in use
    pub fn registry(&self) -> &Arc<FixtureRegistry> {
        &self.registry
    }

    /// Backend in use
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// A fresh fixture in the `Created` state
    pub fn fixture(&self) -> Fixture {
        Fixture::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.registry),
            self.config.clone(),
        )
    }

    /// A fixture with its instance acquired and ready.
    ///
    /// On failure whatever was started is torn down before returning.
    pub fn acquire_instance(&self) -> Result<Fixture> {
        let mut fixture = self.fixture();
        match fixture.acquire_instance() {
            Ok(()) => Ok(fixture),
            Err(e) => Err(abort(fixture, e)),
        }
    }

    /// A fixture with every spec installed, verified if configured.
    ///
    /// All specs are compiled first; a compilation failure returns before
    /// any instance is started.
    pub fn setup(&self, specs: &[IndexSpec]) -> Result<Fixture> {
        let compiled = specs
            .iter()
            .map(compile_index)
            .collect::<Result<Vec<_>>>()?;

        let mut fixture = self.acquire_instance()?;
        for schema in compiled {
            if let Err(e) = fixture.install_compiled(schema) {
                return Err(abort(fixture, e));
            }
        }
        if self.config.verify && !fixture.compiled().is_empty() {
            if let Err(e) = fixture.verify() {
                return Err(abort(fixture, e));
            }
        }
        debug!(
            target: "strata::fixture",
            fixture = %fixture.id(),
            indices = fixture.installed_indices().len(),
            "Setup complete"
        );
        Ok(fixture)
    }

    /// Set up a fixture, run `body` against it, and tear it down.
    ///
    /// The body's error is returned as `Error::Body`, with any teardown
    /// failures attached. Teardown failures after a successful body are
    /// logged, and returned as `Error::Teardown` only with `strict_teardown`.
    pub fn run<T, E, F>(&self, specs: &[IndexSpec], body: F) -> Result<T>
    where
        F: FnOnce(&mut Fixture) -> std::result::Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut fixture = self.setup(specs)?;
        let outcome = body(&mut fixture);
        let teardown = fixture.teardown();

        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(value), Err(failure)) => {
                if self.config.strict_teardown {
                    Err(Error::Teardown(failure))
                } else {
                    warn!(
                        target: "strata::fixture",
                        fixture = %fixture.id(),
                        error = %failure,
                        "Teardown failed after successful test body"
                    );
                    Ok(value)
                }
            }
            (Err(e), Ok(())) => Err(Error::Body(e.into())),
            (Err(e), Err(failure)) => Err(Error::Body(e.into()).with_teardown(failure)),
        }
    }

    /// [`run`](Self::run) with the indices declared in the configuration
    pub fn run_configured<T, E, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut Fixture) -> std::result::Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.run(&self.config.indices, body)
    }
}

/// Tear down after a failed setup step, keeping the setup error primary
fn abort(mut fixture: Fixture, err: Error) -> Error {
    match fixture.teardown() {
        Ok(()) => err,
        Err(failure) => err.with_teardown(failure),
    }
}
