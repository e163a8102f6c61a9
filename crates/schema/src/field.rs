//! Field compiler
//!
//! Wire keys are emitted in a fixed order: `type`, `store`, `index`,
//! `analyzer` | (`index_analyzer`, `search_analyzer`), `term_vector`.
//! Engine defaults are omitted rather than spelled out: `store` appears only
//! when true, `index` only when not analyzed, `term_vector` only when enabled.

use serde_json::{Map, Value};
use strata_fixture_core::{
    validate_field_name, Error, FieldSpec, IndexMode, MultiFieldGroup, Result, Store, TermVector,
};
use tracing::warn;

/// Treat `Some("")` like `None`.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Compile one field into its wire object.
pub fn compile_field(field: &FieldSpec) -> Result<Value> {
    validate_field_name(&field.name)?;

    if field.value_type.is_container() {
        return compile_container(field);
    }
    if !field.properties.is_empty() {
        return Err(invalid_option(field, "properties"));
    }

    let mut out = Map::new();
    out.insert("type".into(), Value::from(field.value_type.wire_name()));

    if field.store == Store::Yes {
        out.insert("store".into(), Value::Bool(true));
    }
    if let Some(index) = field.index.wire_value() {
        out.insert("index".into(), Value::from(index));
    }

    let analyzer = non_empty(&field.analyzer);
    let index_analyzer = non_empty(&field.index_analyzer);
    let search_analyzer = non_empty(&field.search_analyzer);
    if analyzer.is_some() && (index_analyzer.is_some() || search_analyzer.is_some()) {
        return Err(Error::ConflictingAnalyzers(field.name.clone()));
    }
    if let Some(analyzer) = analyzer {
        out.insert("analyzer".into(), Value::from(analyzer));
    }
    if let Some(analyzer) = index_analyzer {
        out.insert("index_analyzer".into(), Value::from(analyzer));
    }
    if let Some(analyzer) = search_analyzer {
        out.insert("search_analyzer".into(), Value::from(analyzer));
    }

    if let Some(term_vector) = field.term_vector.wire_value() {
        out.insert("term_vector".into(), Value::from(term_vector));
    }

    Ok(Value::Object(out))
}

/// Object and nested fields only carry a type and their nested properties.
fn compile_container(field: &FieldSpec) -> Result<Value> {
    if field.store == Store::Yes {
        return Err(invalid_option(field, "store"));
    }
    if field.index != IndexMode::Analyzed {
        return Err(invalid_option(field, "index"));
    }
    if non_empty(&field.analyzer).is_some()
        || non_empty(&field.index_analyzer).is_some()
        || non_empty(&field.search_analyzer).is_some()
    {
        return Err(invalid_option(field, "analyzer"));
    }
    if field.term_vector != TermVector::No {
        return Err(invalid_option(field, "term_vector"));
    }

    let mut out = Map::new();
    out.insert("type".into(), Value::from(field.value_type.wire_name()));
    out.insert(
        "properties".into(),
        Value::Object(compile_properties(&field.name, &field.properties, &[])?),
    );
    Ok(Value::Object(out))
}

fn invalid_option(field: &FieldSpec, option: &'static str) -> Error {
    Error::InvalidFieldOption {
        field: field.name.clone(),
        field_type: field.value_type.wire_name(),
        option,
    }
}

/// Compile a multi-field group into `{type: "multi_field", fields: {...}}`.
///
/// Each member is compiled on its own; members never see each other's options.
pub fn compile_multi_field(group: &MultiFieldGroup) -> Result<Value> {
    validate_field_name(&group.name)?;
    if group.primary().is_none() {
        warn!(
            target: "strata::schema",
            group = %group.name,
            "Multi-field group has no member named like the group"
        );
    }

    let mut fields = Map::new();
    for member in &group.fields {
        if fields.contains_key(&member.name) {
            return Err(Error::DuplicateFieldName {
                owner: group.name.clone(),
                field: member.name.clone(),
            });
        }
        fields.insert(member.name.clone(), compile_field(member)?);
    }

    let mut out = Map::new();
    out.insert("type".into(), Value::from("multi_field"));
    out.insert("fields".into(), Value::Object(fields));
    Ok(Value::Object(out))
}

/// Compile a `properties` map from plain fields followed by multi-field groups.
///
/// Names must be unique across both collections.
pub(crate) fn compile_properties(
    owner: &str,
    fields: &[FieldSpec],
    groups: &[MultiFieldGroup],
) -> Result<Map<String, Value>> {
    let mut properties = Map::new();
    let compiled_fields = fields
        .iter()
        .map(|f| compile_field(f).map(|v| (f.name.as_str(), v)));
    let compiled_groups = groups
        .iter()
        .map(|g| compile_multi_field(g).map(|v| (g.name.as_str(), v)));

    for compiled in compiled_fields.chain(compiled_groups) {
        let (name, value) = compiled?;
        if properties.contains_key(name) {
            return Err(Error::DuplicateFieldName {
                owner: owner.to_string(),
                field: name.to_string(),
            });
        }
        properties.insert(name.to_string(), value);
    }
    Ok(properties)
}
