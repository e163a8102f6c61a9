//! Strata fixtures - declarative document-store test fixtures
//!
//! A test describes the indices it needs (type mappings, field options,
//! `_ttl`/`_timestamp`/`_parent` metadata) and gets a live store instance with
//! exactly that schema installed, verified, and torn down afterwards.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_fixture::{FieldSpec, FieldType, FixtureOrchestrator, IndexSpec, TypeMapping};
//!
//! let library = IndexSpec::new("library").mapping(
//!     TypeMapping::new("book")
//!         .ttl("2d")
//!         .field(FieldSpec::new("title", FieldType::String).stored()),
//! );
//!
//! let orchestrator = FixtureOrchestrator::builder().memory().build()?;
//! orchestrator.run(&[library], |fixture| {
//!     assert!(fixture.index_exists("library")?);
//!     Ok::<_, strata_fixture::Error>(())
//! })?;
//! ```
//!
//! # Architecture
//!
//! - `strata-fixture-core`: specification model, unit parsers, errors
//! - `strata-fixture-schema`: pure compiler from specifications to wire documents
//! - `strata-fixture-engine`: fixture lifecycle, registry, store backends

pub use strata_fixture_core::*;
pub use strata_fixture_engine::*;
pub use strata_fixture_schema::{
    compile_field, compile_index, compile_multi_field, compile_type_mapping, first_difference,
    CompiledSchema, Difference,
};
