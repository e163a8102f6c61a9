//! Schema compiler for Strata fixtures
//!
//! Translates the declarative [`IndexSpec`](strata_fixture_core::IndexSpec)
//! tree into the nested wire documents a document store consumes:
//!
//! - [`field`]: one field or multi-field group → field object
//! - [`mapping`]: one type mapping → `{_source, _ttl?, _timestamp?, _parent?, properties}`
//! - [`compiler`]: one index → every type's mapping, insertion order preserved
//! - [`diff`]: compare a compiled mapping against what a store reports back
//!
//! Compilation is pure and all-or-nothing: it either yields a complete
//! [`CompiledSchema`] or a `Compilation` error wrapping the first failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod diff;
pub mod field;
pub mod mapping;

pub use compiler::{compile_index, CompiledSchema};
pub use diff::{first_difference, Difference};
pub use field::{compile_field, compile_multi_field};
pub use mapping::compile_type_mapping;
