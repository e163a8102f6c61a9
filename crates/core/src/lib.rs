//! Core types for Strata fixtures
//!
//! This crate defines the foundational types shared by the schema compiler
//! and the fixture engine:
//! - Error: Error type hierarchy (compile-time and lifecycle failures)
//! - StoreError: Failures reported by an external document store
//! - Model: Declarative index/type/field specifications (IndexSpec and friends)
//! - Units: Duration and size literal parsers ("2d", "10kb")
//! - Names: Index, type and field name validation
//! - Ids: InstanceId, FixtureId

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model;
pub mod names;
pub mod types;
pub mod units;

pub use error::{Error, Result, StoreError, StoreResult, TeardownFailure, TeardownIssue};
pub use model::{
    FieldSpec, FieldType, IndexMode, IndexSpec, MultiFieldGroup, Store, TermVector, TypeMapping,
};
pub use names::{validate_field_name, validate_index_name, validate_type_name};
pub use types::{FixtureId, InstanceId};
pub use units::{parse_duration, parse_size};
