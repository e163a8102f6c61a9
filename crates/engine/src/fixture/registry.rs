//! Process-wide fixture registry
//!
//! Tracks which fixtures are live, which index names they have claimed on
//! which instance, and the named instances shared between fixtures.
//!
//! Sharing is opt-in (`InstancePolicy::Shared`). A shared instance is started
//! by the first fixture that leases it and stays running after the last
//! lease is released, so later fixtures skip the startup cost. Idle shared
//! instances are stopped by [`FixtureRegistry::shutdown_shared`].
//!
//! Shared instances are keyed by backend and name: two orchestrators over
//! different backends never see each other's instance, even under one name.
//! The registry lock is never held across a backend call.

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strata_fixture_core::{Error, FixtureId, InstanceId, Result, StoreResult, TeardownFailure};
use tracing::{info, warn};

use crate::store::{InstanceControl, InstanceHandle, StoreBackend};

// =============================================================================
// Global Fixture Registry
// =============================================================================
//
// Uses parking_lot::Mutex so a panicking test never poisons the registry for
// the rest of the test binary.

/// Global registry shared by every orchestrator that does not bring its own
pub static GLOBAL_REGISTRY: Lazy<Arc<FixtureRegistry>> =
    Lazy::new(|| Arc::new(FixtureRegistry::new()));

/// Bookkeeping for one live fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFixture {
    /// Instance the fixture runs against
    pub instance: InstanceId,
    /// Whether the fixture owns the instance
    pub exclusive: bool,
}

/// Backend identity plus instance name
type SharedKey = (usize, String);

fn shared_key(backend: &Arc<dyn StoreBackend>, name: &str) -> SharedKey {
    (Arc::as_ptr(backend) as *const () as usize, name.to_string())
}

struct SharedInstance {
    /// Backend that started the instance; also keeps the key's address alive
    backend: Arc<dyn StoreBackend>,
    /// Set once the first lease holder's start succeeds
    handle: Arc<OnceCell<InstanceHandle>>,
    leases: usize,
}

impl fmt::Debug for SharedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedInstance")
            .field("handle", &self.handle.get())
            .field("leases", &self.leases)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    active: HashMap<FixtureId, ActiveFixture>,
    shared: HashMap<SharedKey, SharedInstance>,
    claims: HashMap<(InstanceId, String), FixtureId>,
}

/// Registry of live fixtures, index claims and shared instances
#[derive(Debug, Default)]
pub struct FixtureRegistry {
    state: Mutex<RegistryState>,
}

impl FixtureRegistry {
    /// Create an empty registry (tests that need isolation from the global one)
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Record a fixture as live
    pub fn register(&self, fixture: FixtureId, instance: InstanceId, exclusive: bool) {
        self.state
            .lock()
            .active
            .insert(fixture, ActiveFixture { instance, exclusive });
    }

    /// Forget a fixture and every index claim it holds
    pub fn release(&self, fixture: FixtureId) {
        let mut state = self.state.lock();
        state.active.remove(&fixture);
        state.claims.retain(|_, owner| *owner != fixture);
    }

    /// Whether a fixture is live
    pub fn is_active(&self, fixture: FixtureId) -> bool {
        self.state.lock().active.contains_key(&fixture)
    }

    /// Number of live fixtures
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Number of live fixtures running against an instance
    pub fn active_on(&self, instance: InstanceId) -> usize {
        self.state
            .lock()
            .active
            .values()
            .filter(|a| a.instance == instance)
            .count()
    }

    /// Claim an index name on an instance for a fixture.
    ///
    /// # Errors
    ///
    /// Returns `IndexAlreadyExists` if another live fixture holds the claim.
    pub fn claim_index(
        &self,
        fixture: FixtureId,
        instance: InstanceId,
        index: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let key = (instance, index.to_string());
        match state.claims.get(&key) {
            Some(owner) if *owner != fixture => Err(Error::IndexAlreadyExists(index.to_string())),
            Some(_) => Ok(()),
            None => {
                state.claims.insert(key, fixture);
                Ok(())
            }
        }
    }

    /// Release one index claim held by a fixture
    pub fn release_index(&self, fixture: FixtureId, instance: InstanceId, index: &str) {
        let mut state = self.state.lock();
        let key = (instance, index.to_string());
        if state.claims.get(&key) == Some(&fixture) {
            state.claims.remove(&key);
        }
    }

    /// Lease the shared instance `name` on `backend`, starting it with
    /// `start` if needed.
    ///
    /// The lease is taken under the registry lock; `start` runs outside it.
    /// Concurrent leases of one instance wait for a single start, and a
    /// failed start leaves the slot empty for the next lease to retry.
    pub fn lease_shared<F>(
        &self,
        backend: &Arc<dyn StoreBackend>,
        name: &str,
        start: F,
    ) -> StoreResult<InstanceHandle>
    where
        F: FnOnce() -> StoreResult<InstanceHandle>,
    {
        let key = shared_key(backend, name);
        let cell = {
            let mut state = self.state.lock();
            let shared = state.shared.entry(key.clone()).or_insert_with(|| SharedInstance {
                backend: Arc::clone(backend),
                handle: Arc::new(OnceCell::new()),
                leases: 0,
            });
            shared.leases += 1;
            Arc::clone(&shared.handle)
        };

        let started = cell.get_or_try_init(|| -> StoreResult<InstanceHandle> {
            let handle = start()?;
            info!(target: "strata::registry", name, instance = %handle, "Started shared instance");
            Ok(handle)
        });
        match started {
            Ok(handle) => Ok(handle.clone()),
            Err(e) => {
                let mut state = self.state.lock();
                if let Some(shared) = state.shared.get_mut(&key) {
                    shared.leases = shared.leases.saturating_sub(1);
                    if shared.leases == 0 && shared.handle.get().is_none() {
                        state.shared.remove(&key);
                    }
                }
                Err(e)
            }
        }
    }

    /// Release one lease; returns the leases left
    pub fn release_shared(&self, backend: &Arc<dyn StoreBackend>, name: &str) -> usize {
        let mut state = self.state.lock();
        match state.shared.get_mut(&shared_key(backend, name)) {
            Some(shared) => {
                shared.leases = shared.leases.saturating_sub(1);
                shared.leases
            }
            None => 0,
        }
    }

    /// Remove an idle shared instance so the next lease starts a fresh one.
    ///
    /// Returns the handle for the caller to stop through `backend`, or None
    /// if it is still leased.
    pub fn evict_shared(
        &self,
        backend: &Arc<dyn StoreBackend>,
        name: &str,
    ) -> Option<InstanceHandle> {
        let key = shared_key(backend, name);
        let mut state = self.state.lock();
        if state.shared.get(&key).map(|s| s.leases) != Some(0) {
            return None;
        }
        state
            .shared
            .remove(&key)
            .and_then(|s| s.handle.get().cloned())
    }

    /// Started shared instance names and their lease counts
    pub fn shared_instances(&self) -> Vec<(String, usize)> {
        let mut shared: Vec<_> = self
            .state
            .lock()
            .shared
            .iter()
            .filter(|(_, s)| s.handle.get().is_some())
            .map(|((_, name), s)| (name.clone(), s.leases))
            .collect();
        shared.sort();
        shared
    }

    /// Stop every idle shared instance through the backend that started it.
    ///
    /// Leased instances are left running. Stop failures are collected.
    pub fn shutdown_shared(&self) -> std::result::Result<(), TeardownFailure> {
        let idle: Vec<(String, Arc<dyn StoreBackend>, Option<InstanceHandle>)> = {
            let mut state = self.state.lock();
            let keys: Vec<SharedKey> = state
                .shared
                .iter()
                .filter(|(_, s)| s.leases == 0)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| {
                    let shared = state.shared.remove(&key)?;
                    Some((key.1, shared.backend, shared.handle.get().cloned()))
                })
                .collect()
        };

        let mut failures = TeardownFailure::default();
        for (name, backend, handle) in idle {
            let Some(handle) = handle else { continue };
            match backend.stop(&handle) {
                Ok(()) => info!(
                    target: "strata::registry",
                    name = %name,
                    "Stopped shared instance"
                ),
                Err(e) => {
                    warn!(
                        target: "strata::registry",
                        name = %name,
                        error = %e,
                        "Failed to stop shared instance"
                    );
                    failures.push(format!("shared instance '{}'", name), e);
                }
            }
        }
        for (name, leases) in self.shared_instances() {
            warn!(
                target: "strata::registry",
                name = %name,
                leases,
                "Shared instance still leased; left running"
            );
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}
