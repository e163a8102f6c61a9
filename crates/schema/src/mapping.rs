//! Type mapping compiler
//!
//! Produces one type's mapping document:
//!
//! ```text
//! {
//!   "_source":    {"enabled": .., "compress": .., "compress_threshold"?: ..},  always
//!   "_ttl":       {"enabled": true, "default"?: <millis>},                     ttl only
//!   "_timestamp": {"enabled": true, "format"?: .., "path"?: ..},               timestamp only
//!   "_parent":    {"type": ..},                                                parent only
//!   "properties": {..}
//! }
//! ```

use serde_json::{Map, Value};
use strata_fixture_core::{parse_duration, parse_size, validate_type_name, Result, TypeMapping};
use tracing::warn;

use crate::field::compile_properties;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Compile one type mapping into its wire document.
pub fn compile_type_mapping(mapping: &TypeMapping) -> Result<Value> {
    validate_type_name(&mapping.type_name)?;

    let mut doc = Map::new();
    doc.insert("_source".into(), Value::Object(source_block(mapping)?));

    if mapping.ttl_enabled {
        let mut ttl = Map::new();
        ttl.insert("enabled".into(), Value::Bool(true));
        if let Some(literal) = non_empty(&mapping.ttl_value) {
            ttl.insert("default".into(), Value::from(parse_duration(literal)?));
        }
        doc.insert("_ttl".into(), Value::Object(ttl));
    }

    if mapping.timestamp_enabled {
        let mut timestamp = Map::new();
        timestamp.insert("enabled".into(), Value::Bool(true));
        if let Some(format) = non_empty(&mapping.timestamp_format) {
            timestamp.insert("format".into(), Value::from(format));
        }
        if let Some(path) = non_empty(&mapping.timestamp_path) {
            timestamp.insert("path".into(), Value::from(path));
        }
        doc.insert("_timestamp".into(), Value::Object(timestamp));
    }

    if let Some(parent) = non_empty(&mapping.parent_type) {
        let mut block = Map::new();
        block.insert("type".into(), Value::from(parent));
        doc.insert("_parent".into(), Value::Object(block));
    }

    let properties = compile_properties(
        &mapping.type_name,
        &mapping.fields,
        &mapping.multi_field_groups,
    )?;
    doc.insert("properties".into(), Value::Object(properties));

    Ok(Value::Object(doc))
}

fn source_block(mapping: &TypeMapping) -> Result<Map<String, Value>> {
    let mut source = Map::new();
    source.insert("enabled".into(), Value::Bool(mapping.source_enabled));
    source.insert("compress".into(), Value::Bool(mapping.compress));

    if let Some(literal) = non_empty(&mapping.compress_threshold) {
        // Validated even when compress is disabled.
        let threshold = parse_size(literal)?;
        if mapping.compress {
            source.insert("compress_threshold".into(), Value::from(threshold));
        } else {
            warn!(
                target: "strata::schema",
                type_name = %mapping.type_name,
                threshold = %threshold,
                "compress_threshold ignored because compress is disabled"
            );
        }
    }
    Ok(source)
}
