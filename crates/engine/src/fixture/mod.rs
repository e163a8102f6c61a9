//! Fixture lifecycle
//!
//! A [`Fixture`] owns everything one test execution creates in a document
//! store: the instance it runs against and the indices it installed. Its
//! phases run strictly in order:
//!
//! ```text
//! Created ──acquire_instance──▶ InstanceReady ──install_schema──▶ SchemaInstalled
//!                                                                      │
//!                                                                   verify
//!                                                                      ▼
//!                            TornDown ◀──────────teardown─────────── Verified
//! ```
//!
//! Any failed lifecycle operation moves the fixture to `Error`; from there
//! only `teardown` is allowed. Teardown is reachable from every state, is
//! idempotent, and runs from `Drop` so an unwinding test still releases its
//! resources.
//!
//! Every lifecycle method takes `&mut self`, so one fixture's phases are
//! serialized by the borrow checker.

pub mod builder;
pub mod config;
pub mod orchestrator;
pub mod poll;
pub mod registry;

pub use builder::FixtureBuilder;
pub use config::{
    FixtureConfig, InstanceConfig, InstancePolicy, CONFIG_FILE_NAME, DEFAULT_SHARED_INSTANCE,
};
pub use orchestrator::FixtureOrchestrator;
pub use poll::PollConfig;
pub use registry::{ActiveFixture, FixtureRegistry, GLOBAL_REGISTRY};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use strata_fixture_core::{
    Error, FixtureId, IndexSpec, Result, StoreError, TeardownFailure,
};
use strata_fixture_schema::{compile_index, first_difference, CompiledSchema, Difference};
use tracing::{debug, info, warn};

use crate::store::{InstanceHandle, StoreBackend};
use poll::PollOutcome;

const LOG_TARGET: &str = "strata::fixture";

/// Lifecycle state of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureState {
    /// Nothing acquired yet
    Created,
    /// Instance started (or leased) and ready
    InstanceReady,
    /// At least one index installed
    SchemaInstalled,
    /// Installed mappings match the compiled ones
    Verified,
    /// Every resource released; terminal
    TornDown,
    /// A lifecycle operation failed; only teardown is allowed
    Error,
}

impl FixtureState {
    /// True for `TornDown`
    pub fn is_terminal(&self) -> bool {
        matches!(self, FixtureState::TornDown)
    }
}

impl fmt::Display for FixtureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixtureState::Created => "created",
            FixtureState::InstanceReady => "instance-ready",
            FixtureState::SchemaInstalled => "schema-installed",
            FixtureState::Verified => "verified",
            FixtureState::TornDown => "torn-down",
            FixtureState::Error => "error",
        };
        f.write_str(name)
    }
}

/// How the fixture holds its instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Started by this fixture; stopped at teardown
    Exclusive,
    /// Leased from the registry under `name`; left running at teardown
    Shared {
        /// Registry key of the shared instance
        name: String,
    },
}

/// One test execution's view of a document store
pub struct Fixture {
    id: FixtureId,
    backend: Arc<dyn StoreBackend>,
    registry: Arc<FixtureRegistry>,
    config: FixtureConfig,
    instance: Option<InstanceHandle>,
    ownership: Option<Ownership>,
    instance_ready: bool,
    installed: Vec<String>,
    compiled: Vec<CompiledSchema>,
    state: FixtureState,
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("instance", &self.instance)
            .field("ownership", &self.ownership)
            .field("installed", &self.installed)
            .finish()
    }
}

impl Fixture {
    /// Create a fixture in the `Created` state. Nothing touches the store yet.
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        registry: Arc<FixtureRegistry>,
        config: FixtureConfig,
    ) -> Self {
        Self {
            id: FixtureId::new(),
            backend,
            registry,
            config,
            instance: None,
            ownership: None,
            instance_ready: false,
            installed: Vec::new(),
            compiled: Vec::new(),
            state: FixtureState::Created,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Fixture id
    pub fn id(&self) -> FixtureId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> FixtureState {
        self.state
    }

    /// Instance handle, once acquired
    pub fn instance(&self) -> Option<&InstanceHandle> {
        self.instance.as_ref()
    }

    /// Whether the instance is exclusive or shared, once acquired
    pub fn ownership(&self) -> Option<&Ownership> {
        self.ownership.as_ref()
    }

    /// Index names installed by this fixture, in install order
    pub fn installed_indices(&self) -> &[String] {
        &self.installed
    }

    /// Compiled schemas installed by this fixture
    pub fn compiled(&self) -> &[CompiledSchema] {
        &self.compiled
    }

    /// Configuration the fixture runs with
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// The store backend
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Whether an index exists on the fixture's instance
    pub fn index_exists(&self, index: &str) -> Result<bool> {
        let handle = self.handle("check index")?;
        Ok(self.backend.exists(handle, index)?)
    }

    /// Mapping the store reports for one type
    pub fn get_mapping(&self, index: &str, type_name: &str) -> Result<Option<Value>> {
        let handle = self.handle("read mapping")?;
        Ok(self.backend.get_mapping(handle, index, type_name)?)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start an exclusive instance, or lease the shared one, and wait until
    /// it reports ready.
    ///
    /// # Errors
    ///
    /// - `InstanceUnavailable` if readiness polling exhausts its budget
    /// - `Store` if the instance cannot be started
    /// - `InvalidState` unless the fixture is `Created`
    pub fn acquire_instance(&mut self) -> Result<()> {
        self.expect_state("acquire instance", &[FixtureState::Created])?;
        match self.try_acquire() {
            Ok(()) => {
                self.instance_ready = true;
                self.transition(FixtureState::InstanceReady);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn try_acquire(&mut self) -> Result<()> {
        self.config.readiness.validate("readiness")?;
        let backend = Arc::clone(&self.backend);
        let instance_config = &self.config.instance;

        let (handle, ownership) = match instance_config.policy {
            InstancePolicy::Exclusive => (backend.start(instance_config)?, Ownership::Exclusive),
            InstancePolicy::Shared => {
                let name = instance_config.shared_name().to_string();
                let handle = self
                    .registry
                    .lease_shared(&backend, &name, || backend.start(instance_config))?;
                (handle, Ownership::Shared { name })
            }
        };
        let exclusive = ownership == Ownership::Exclusive;
        info!(
            target: LOG_TARGET,
            fixture = %self.id,
            instance = %handle,
            exclusive,
            "Acquired instance"
        );

        self.registry.register(self.id, handle.id, exclusive);
        self.instance = Some(handle.clone());
        self.ownership = Some(ownership);

        match self
            .config
            .readiness
            .poll_until("readiness", || backend.is_ready(&handle))
        {
            PollOutcome::Ready { attempts } => {
                debug!(target: LOG_TARGET, fixture = %self.id, attempts, "Instance ready");
                Ok(())
            }
            PollOutcome::Exhausted { attempts } => Err(Error::InstanceUnavailable {
                instance: handle.to_string(),
                attempts,
            }),
        }
    }

    /// Compile `spec` and install it on the fixture's instance.
    ///
    /// Compilation happens before any store request, so a malformed spec
    /// never reaches the store.
    ///
    /// # Errors
    ///
    /// - `Compilation` if the spec does not compile
    /// - `IndexAlreadyExists` if the index exists and `force_recreate` is off,
    ///   or another live fixture has claimed the name on this instance
    /// - `IndexPropagation` if create/drop does not become visible in time
    pub fn install_schema(&mut self, spec: &IndexSpec) -> Result<()> {
        self.expect_installable()?;
        match compile_index(spec) {
            Ok(schema) => self.install_compiled(schema),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Install an already compiled schema.
    pub fn install_compiled(&mut self, schema: CompiledSchema) -> Result<()> {
        self.expect_installable()?;
        match self.try_install(&schema) {
            Ok(()) => {
                self.compiled.push(schema);
                self.transition(FixtureState::SchemaInstalled);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn try_install(&mut self, schema: &CompiledSchema) -> Result<()> {
        let handle = self.handle("install schema")?.clone();
        let index = schema.index();

        if self.installed.iter().any(|name| name == index) {
            return Err(Error::IndexAlreadyExists(index.to_string()));
        }
        self.registry.claim_index(self.id, handle.id, index)?;

        if self.backend.exists(&handle, index)? {
            if !self.config.force_recreate {
                self.registry.release_index(self.id, handle.id, index);
                return Err(Error::IndexAlreadyExists(index.to_string()));
            }
            info!(target: LOG_TARGET, fixture = %self.id, index, "Dropping existing index");
            self.backend.delete_index(&handle, index)?;
            self.await_index(&handle, index, false)?;
        }

        self.backend
            .create_index(&handle, index, schema.settings())
            .map_err(|e| match e {
                StoreError::IndexExists(name) => Error::IndexAlreadyExists(name),
                other => Error::Store(other),
            })?;
        self.installed.push(index.to_string());
        info!(target: LOG_TARGET, fixture = %self.id, index, "Created index");
        self.await_index(&handle, index, true)?;

        for (type_name, mapping) in schema.mappings() {
            self.backend.put_mapping(&handle, index, type_name, mapping)?;
            debug!(
                target: LOG_TARGET,
                fixture = %self.id,
                index,
                type_name = %type_name,
                "Installed mapping"
            );
        }
        Ok(())
    }

    fn await_index(&self, handle: &InstanceHandle, index: &str, present: bool) -> Result<()> {
        let outcome = self.config.propagation.poll_until("propagation", || {
            self.backend.exists(handle, index).map(|exists| exists == present)
        });
        match outcome {
            PollOutcome::Ready { .. } => Ok(()),
            PollOutcome::Exhausted { attempts } => Err(Error::IndexPropagation {
                index: index.to_string(),
                still: if present { "missing" } else { "present" },
                attempts,
            }),
        }
    }

    /// Check every installed index against what was compiled for it.
    ///
    /// The stored mapping may carry extra keys; every compiled key must be
    /// present with an equal value.
    ///
    /// # Errors
    ///
    /// `MappingMismatch` naming the first differing path.
    pub fn verify(&mut self) -> Result<()> {
        self.expect_state(
            "verify",
            &[FixtureState::SchemaInstalled, FixtureState::Verified],
        )?;
        match self.try_verify() {
            Ok(()) => {
                self.transition(FixtureState::Verified);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn try_verify(&self) -> Result<()> {
        let handle = self.handle("verify")?;
        for schema in &self.compiled {
            let index = schema.index();
            let index_exists = self.backend.exists(handle, index)?;
            for (type_name, expected) in schema.mappings() {
                let actual = if index_exists {
                    self.backend.get_mapping(handle, index, type_name)?
                } else {
                    None
                };
                let difference = match actual {
                    Some(actual) => first_difference(expected, &actual),
                    None => Some(Difference {
                        path: "<root>".to_string(),
                        expected: expected.to_string(),
                        actual: "<missing>".to_string(),
                    }),
                };
                if let Some(d) = difference {
                    return Err(Error::MappingMismatch {
                        index: index.to_string(),
                        type_name: type_name.clone(),
                        path: d.path,
                        expected: d.expected,
                        actual: d.actual,
                    });
                }
            }
            debug!(target: LOG_TARGET, fixture = %self.id, index, "Verified index");
        }
        Ok(())
    }

    /// Release everything the fixture created.
    ///
    /// Drops installed indices in reverse install order, releases index
    /// claims, then stops the instance if it is exclusive or returns the
    /// lease if it is shared. Every step is attempted; failures are logged
    /// and returned together. The fixture always ends `TornDown`, and a
    /// second call is a no-op.
    pub fn teardown(&mut self) -> std::result::Result<(), TeardownFailure> {
        if self.state.is_terminal() {
            return Ok(());
        }
        let mut failures = TeardownFailure::default();

        if let Some(handle) = self.instance.clone() {
            let installed: Vec<String> = self.installed.drain(..).rev().collect();
            for index in installed {
                match self.backend.delete_index(&handle, &index) {
                    Ok(()) => info!(
                        target: LOG_TARGET,
                        fixture = %self.id,
                        index = %index,
                        "Dropped index"
                    ),
                    Err(StoreError::IndexNotFound(_)) => {
                        debug!(
                            target: LOG_TARGET,
                            fixture = %self.id,
                            index = %index,
                            "Index already gone"
                        )
                    }
                    Err(e) => {
                        warn!(
                            target: LOG_TARGET,
                            fixture = %self.id,
                            index = %index,
                            error = %e,
                            "Failed to drop index"
                        );
                        failures.push(format!("index '{}'", index), e);
                    }
                }
                self.registry.release_index(self.id, handle.id, &index);
            }

            match self.ownership.clone() {
                Some(Ownership::Exclusive) => self.stop_instance(&handle, &mut failures),
                Some(Ownership::Shared { name }) => {
                    let remaining = self.registry.release_shared(&self.backend, &name);
                    debug!(
                        target: LOG_TARGET,
                        fixture = %self.id,
                        name = %name,
                        remaining,
                        "Released shared instance"
                    );
                    // An instance that never came up is not worth keeping.
                    if remaining == 0 && !self.instance_ready {
                        if let Some(shared) = self.registry.evict_shared(&self.backend, &name) {
                            self.stop_instance(&shared, &mut failures);
                        }
                    }
                }
                None => {}
            }
        }

        self.registry.release(self.id);
        self.transition(FixtureState::TornDown);

        if failures.is_empty() {
            Ok(())
        } else {
            warn!(
                target: LOG_TARGET,
                fixture = %self.id,
                failures = failures.len(),
                "Teardown incomplete"
            );
            Err(failures)
        }
    }

    fn stop_instance(&self, handle: &InstanceHandle, failures: &mut TeardownFailure) {
        match self.backend.stop(handle) {
            Ok(()) => info!(
                target: LOG_TARGET,
                fixture = %self.id,
                instance = %handle,
                "Stopped instance"
            ),
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    fixture = %self.id,
                    instance = %handle,
                    error = %e,
                    "Failed to stop instance"
                );
                failures.push(format!("instance {}", handle), e);
            }
        }
    }

    // ========================================================================
    // State helpers
    // ========================================================================

    fn handle(&self, operation: &'static str) -> Result<&InstanceHandle> {
        self.instance.as_ref().ok_or_else(|| Error::InvalidState {
            operation,
            state: self.state.to_string(),
        })
    }

    fn expect_state(&self, operation: &'static str, allowed: &[FixtureState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn expect_installable(&self) -> Result<()> {
        self.expect_state(
            "install schema",
            &[
                FixtureState::InstanceReady,
                FixtureState::SchemaInstalled,
                FixtureState::Verified,
            ],
        )
    }

    fn transition(&mut self, to: FixtureState) {
        if self.state != to {
            debug!(
                target: LOG_TARGET,
                fixture = %self.id,
                from = %self.state,
                to = %to,
                "State transition"
            );
            self.state = to;
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(
            target: LOG_TARGET,
            fixture = %self.id,
            state = %self.state,
            error = %err,
            "Lifecycle operation failed"
        );
        self.transition(FixtureState::Error);
        err
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        // Failures were logged by teardown itself
        let _ = self.teardown();
    }
}
