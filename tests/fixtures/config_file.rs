//! Configuration File Tests
//!
//! A whole fixture declared in `fixture.toml` and run with `run_configured`.

use crate::common::*;
use serde_json::json;
use std::sync::Arc;
use strata_fixture::{InstancePolicy, CONFIG_FILE_NAME};
use tempfile::TempDir;

const LIBRARY_TOML: &str = r#"
force_recreate = false
verify = true

[instance]
policy = "exclusive"
name = "library-node"

[readiness]
max_attempts = 5
interval_ms = 1

[propagation]
max_attempts = 5
interval_ms = 1

[[index]]
name = "library"

[index.settings]
number_of_shards = 1

[[index.mapping]]
type = "book"
source = false
ttl = true
ttl_value = "2d"
timestamp = true
timestamp_format = "YYYY-MM-dd"
timestamp_path = "publication_date"

[[index.mapping.field]]
name = "title"
type = "string"
store = "yes"

[[index.mapping.field]]
name = "role"
type = "string"
index_analyzer = "keyword"
search_analyzer = "standard"

[[index.mapping.multi_field]]
name = "name"

[[index.mapping.multi_field.field]]
name = "name"
type = "string"
term_vector = "with_offsets"

[[index.mapping.multi_field.field]]
name = "untouched"
type = "string"
index = "not_analyzed"

[[index.mapping]]
type = "rating"
compress = true
compress_threshold = "10kb"
parent = "book"

[[index.mapping.field]]
name = "stars"
type = "integer"
index = "not_analyzed"
"#;

#[test]
fn fixture_declared_in_toml_runs() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), LIBRARY_TOML).unwrap();
    let config = FixtureConfig::from_dir(dir.path()).unwrap();
    assert_eq!(config.instance.policy, InstancePolicy::Exclusive);

    let store = CountingStore::new();
    let orchestrator = FixtureOrchestrator::builder()
        .backend(store.clone())
        .registry(Arc::new(FixtureRegistry::new()))
        .config(config)
        .build()
        .unwrap();

    orchestrator
        .run_configured(|fixture| {
            assert_eq!(fixture.instance().unwrap().name, "library-node");
            let book = fixture.get_mapping("library", "book")?.unwrap();
            assert_eq!(book["_ttl"], json!({"enabled": true, "default": 172_800_000}));
            assert_eq!(
                book["properties"]["name"]["fields"]["untouched"],
                json!({"type": "string", "index": "not_analyzed"})
            );
            let rating = fixture.get_mapping("library", "rating")?.unwrap();
            assert_eq!(rating["_parent"], json!({"type": "book"}));
            Ok::<_, Error>(())
        })
        .unwrap();
    assert_eq!(store.put_mappings(), 2);
}

#[test]
fn written_config_reloads_identically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    let config = FixtureConfig {
        indices: vec![library_spec()],
        ..FixtureConfig::default()
    };

    config.write_to_file(&path).unwrap();
    assert_eq!(FixtureConfig::from_file(&path).unwrap(), config);
}

#[test]
fn invalid_declaration_fails_at_load() {
    let dir = TempDir::new().unwrap();
    let broken = LIBRARY_TOML.replace(
        "compress_threshold = \"10kb\"",
        "compress_threshold = \"10 kb\"",
    );
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), broken).unwrap();

    let err = FixtureConfig::from_dir(dir.path()).unwrap_err();
    assert!(err.is_compilation());
    assert!(matches!(err.root(), Error::InvalidLiteral { .. }));
}
