//! Index schema compiler
//!
//! Compiles a whole [`IndexSpec`] into a [`CompiledSchema`]. Type mappings are
//! compiled in declaration order and the resulting document preserves that
//! order, so two compilations of the same spec serialize identically.
//!
//! Validation performed here, before anything touches a store:
//! - index name rules (see `strata_fixture_core::names`)
//! - unique type names
//! - every `_parent` names another type declared in the same index
//! - everything the type mapping and field compilers check
//!
//! Any failure is wrapped in `Error::Compilation` and no partial schema is
//! returned.

use serde_json::{Map, Value};
use strata_fixture_core::{validate_index_name, Error, IndexSpec, Result};
use tracing::debug;

use crate::mapping::compile_type_mapping;

/// The wire documents for one index
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    index: String,
    settings: Map<String, Value>,
    mappings: Map<String, Value>,
}

impl CompiledSchema {
    /// Index name
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Index settings for index creation
    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// Type name → mapping document, in declaration order
    pub fn mappings(&self) -> &Map<String, Value> {
        &self.mappings
    }

    /// Mapping document of one type
    pub fn mapping(&self, type_name: &str) -> Option<&Value> {
        self.mappings.get(type_name)
    }

    /// Type names in declaration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    /// The full schema document: `{<type>: <mapping>, ...}`
    pub fn to_document(&self) -> Value {
        Value::Object(self.mappings.clone())
    }
}

/// Compile an index specification.
///
/// # Errors
///
/// Returns `Error::Compilation` wrapping the first failure encountered.
pub fn compile_index(spec: &IndexSpec) -> Result<CompiledSchema> {
    compile_unwrapped(spec).map_err(|e| Error::compilation(&spec.name, e))
}

fn compile_unwrapped(spec: &IndexSpec) -> Result<CompiledSchema> {
    validate_index_name(&spec.name)?;

    let mut mappings = Map::new();
    for mapping in &spec.type_mappings {
        if mappings.contains_key(&mapping.type_name) {
            return Err(Error::DuplicateTypeName(mapping.type_name.clone()));
        }
        if let Some(parent) = mapping.parent_type.as_deref().filter(|p| !p.is_empty()) {
            let declared = spec
                .type_mappings
                .iter()
                .any(|other| other.type_name == parent && other.type_name != mapping.type_name);
            if !declared {
                return Err(Error::UnknownParentType {
                    type_name: mapping.type_name.clone(),
                    parent: parent.to_string(),
                });
            }
        }
        mappings.insert(mapping.type_name.clone(), compile_type_mapping(mapping)?);
    }

    debug!(
        target: "strata::schema",
        index = %spec.name,
        types = mappings.len(),
        "Compiled index schema"
    );

    Ok(CompiledSchema {
        index: spec.name.clone(),
        settings: spec.settings.clone(),
        mappings,
    })
}
