//! Mapping comparison
//!
//! Stores commonly echo a mapping back with extra keys filled in (defaults,
//! internal bookkeeping). Comparison is therefore a subset match: every key
//! present in the compiled document must be present in the stored one with
//! an equal value. Numbers compare by value regardless of integer/float
//! representation.
//!
//! Field definitions (members of a `properties` or multi-field `fields`
//! map) are stricter. The compiler omits `store`, `index`, `term_vector`
//! and the analyzers when they hold their defaults, so a stored field may
//! only carry those keys at the default value.

use serde_json::Value;

/// Field attributes omitted from compiled output when at their default
const DEFAULTED_FIELD_KEYS: [&str; 6] = [
    "store",
    "index",
    "term_vector",
    "analyzer",
    "index_analyzer",
    "search_analyzer",
];

/// First point at which a stored document fails to match the compiled one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    /// Dotted path from the document root (`<root>` for the root itself)
    pub path: String,
    /// Compiled value at `path`, or `<absent>`
    pub expected: String,
    /// Stored value at `path`, or `<missing>`
    pub actual: String,
}

/// Find the first difference between a compiled document and a stored one.
///
/// Returns None when `actual` contains everything in `expected` and no
/// field definition carries a non-default attribute the compiled one omits.
pub fn first_difference(expected: &Value, actual: &Value) -> Option<Difference> {
    let mut path = Vec::new();
    walk(expected, Some(actual), &mut path)
}

fn walk<'a>(
    expected: &'a Value,
    actual: Option<&Value>,
    path: &mut Vec<&'a str>,
) -> Option<Difference> {
    let Some(actual) = actual else {
        return Some(difference(path, expected, None));
    };
    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (key, expected_value) in expected_map {
                path.push(key);
                let found = walk(expected_value, actual_map.get(key), path);
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            if !is_field_definition(path) {
                return None;
            }
            for key in DEFAULTED_FIELD_KEYS {
                if expected_map.contains_key(key) {
                    continue;
                }
                match actual_map.get(key) {
                    Some(value) if !is_default_attribute(key, value) => {
                        path.push(key);
                        let mut found = difference(path, &Value::Null, Some(value));
                        path.pop();
                        found.expected = "<absent>".to_string();
                        return Some(found);
                    }
                    _ => {}
                }
            }
            None
        }
        (Value::Number(a), Value::Number(b)) if a == b || a.as_f64() == b.as_f64() => None,
        (a, b) if a == b => None,
        _ => Some(difference(path, expected, Some(actual))),
    }
}

/// Whether `path` names an entry of a `properties` or `fields` map
fn is_field_definition(path: &[&str]) -> bool {
    matches!(path, [.., "properties" | "fields", _])
}

fn is_default_attribute(key: &str, value: &Value) -> bool {
    match key {
        "store" => value == &Value::Bool(false) || value.as_str() == Some("no"),
        "index" => value.as_str() == Some("analyzed"),
        "term_vector" => value.as_str() == Some("no"),
        _ => false,
    }
}

fn difference(path: &[&str], expected: &Value, actual: Option<&Value>) -> Difference {
    Difference {
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.join(".")
        },
        expected: expected.to_string(),
        actual: actual.map_or_else(|| "<missing>".to_string(), Value::to_string),
    }
}
