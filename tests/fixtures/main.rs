//! Fixture integration tests
//!
//! End-to-end behavior of the schema compiler and the fixture lifecycle
//! against the in-process store.

#[path = "../common/mod.rs"]
mod common;

mod config_file;
mod library;
mod lifecycle;
mod shared_instances;
