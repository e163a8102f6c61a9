//! Fixture engine for Strata fixtures
//!
//! This crate drives document-store instances on behalf of tests:
//! - Fixture: lifecycle state machine (acquire, install, verify, teardown)
//! - FixtureOrchestrator: scoped `run(specs, body)` with guaranteed teardown
//! - FixtureRegistry: live fixtures, index claims and shared instances
//! - FixtureConfig: `fixture.toml` configuration
//! - Store: collaborator traits plus the in-memory and HTTP backends
//!
//! The engine is the only component that talks to a store; schema
//! compilation lives in `strata-fixture-schema` and never does I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fixture;
pub mod store;

pub use fixture::{
    ActiveFixture, Fixture, FixtureBuilder, FixtureConfig, FixtureOrchestrator, FixtureRegistry,
    FixtureState, InstanceConfig, InstancePolicy, Ownership, PollConfig, CONFIG_FILE_NAME,
    DEFAULT_SHARED_INSTANCE, GLOBAL_REGISTRY,
};
pub use store::{IndexAdmin, InstanceControl, InstanceHandle, MemoryStore, StoreBackend};

#[cfg(feature = "http")]
pub use store::HttpStore;
