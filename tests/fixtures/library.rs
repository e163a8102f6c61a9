//! Library Scenario Tests
//!
//! The "library" index (book + rating) compiled, installed, read back and
//! protected against clobbering an existing index.

use crate::common::*;
use serde_json::json;
use strata_fixture::compile_index;

fn expected_book() -> serde_json::Value {
    json!({
        "_source": {"enabled": false, "compress": false},
        "_ttl": {"enabled": true, "default": 172_800_000},
        "_timestamp": {"enabled": true, "format": "YYYY-MM-dd", "path": "publication_date"},
        "properties": {
            "title": {"type": "string", "store": true},
            "author": {"type": "string", "index": "not_analyzed"},
            "description": {"type": "string", "store": true, "analyzer": "standard"},
            "role": {"type": "string", "index_analyzer": "keyword", "search_analyzer": "standard"},
            "publication_date": {"type": "date", "index": "not_analyzed"},
            "name": {
                "type": "multi_field",
                "fields": {
                    "name": {"type": "string", "term_vector": "with_offsets"},
                    "untouched": {
                        "type": "string",
                        "index": "not_analyzed",
                        "term_vector": "with_positions_offsets"
                    }
                }
            }
        }
    })
}

fn expected_rating() -> serde_json::Value {
    json!({
        "_source": {"enabled": true, "compress": true, "compress_threshold": "10kb"},
        "_parent": {"type": "book"},
        "properties": {
            "stars": {"type": "integer", "index": "not_analyzed"}
        }
    })
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn library_compiles_to_exact_structure() {
    let schema = compile_index(&library_spec()).unwrap();
    assert_eq!(schema.index(), "library");
    assert_eq!(schema.type_names().collect::<Vec<_>>(), vec!["book", "rating"]);
    assert_eq!(schema.mapping("book"), Some(&expected_book()));
    assert_eq!(schema.mapping("rating"), Some(&expected_rating()));
    assert_eq!(
        schema.to_document(),
        json!({"book": expected_book(), "rating": expected_rating()})
    );
}

#[test]
fn library_serializes_in_declaration_order() {
    let schema = compile_index(&library_spec()).unwrap();
    let book = serde_json::to_string(schema.mapping("book").unwrap()).unwrap();
    let position = |key: &str| book.find(key).unwrap();
    assert!(position("\"_source\"") < position("\"_ttl\""));
    assert!(position("\"_ttl\"") < position("\"_timestamp\""));
    assert!(position("\"_timestamp\"") < position("\"properties\""));
    assert!(position("\"title\"") < position("\"author\""));
    assert!(position("\"publication_date\":{") < position("\"multi_field\""));
}

// ============================================================================
// Installation
// ============================================================================

#[test]
fn library_round_trips_through_store() {
    let store = CountingStore::new();
    orchestrator(&store)
        .run(&[library_spec()], |fixture| {
            assert_eq!(fixture.state(), FixtureState::Verified);
            assert!(fixture.index_exists("library")?);
            assert_eq!(fixture.get_mapping("library", "book")?, Some(expected_book()));
            assert_eq!(fixture.get_mapping("library", "rating")?, Some(expected_rating()));
            Ok::<_, Error>(())
        })
        .unwrap();

    assert_eq!(store.creates(), 1);
    assert_eq!(store.put_mappings(), 2);
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.stops(), 1);
}

#[test]
fn library_settings_reach_the_store() {
    let store = CountingStore::new();
    let spec = library_spec()
        .setting("number_of_shards", 1)
        .setting("number_of_replicas", 0);
    orchestrator(&store)
        .run(&[spec], |fixture| {
            let handle = fixture.instance().unwrap();
            let settings = store.inner.index_settings(handle, "library")?;
            assert_eq!(settings["number_of_shards"], 1);
            assert_eq!(settings["number_of_replicas"], 0);
            Ok::<_, StoreError>(())
        })
        .unwrap();
}

#[test]
fn existing_index_is_left_untouched() {
    let store = CountingStore::new();
    let orchestrator = orchestrator(&store);
    let mut fixture = orchestrator.acquire_instance().unwrap();
    let handle = fixture.instance().cloned().unwrap();

    let legacy = json!({"properties": {"isbn": {"type": "string", "index": "not_analyzed"}}});
    store
        .inner
        .create_index(&handle, "library", &Default::default())
        .unwrap();
    store.inner.put_mapping(&handle, "library", "book", &legacy).unwrap();

    let err = fixture.install_schema(&library_spec()).unwrap_err();
    assert!(matches!(err, Error::IndexAlreadyExists(ref name) if name == "library"));
    assert_eq!(fixture.state(), FixtureState::Error);
    assert_eq!(store.creates(), 0);
    assert_eq!(store.put_mappings(), 0);
    assert_eq!(
        store.inner.get_mapping(&handle, "library", "book").unwrap(),
        Some(legacy.clone())
    );

    // Teardown only drops what the fixture created; it still stops the instance
    fixture.teardown().unwrap();
    assert_eq!(store.deletes(), 0);
    assert_eq!(store.stops(), 1);
}

#[test]
fn force_recreate_replaces_existing_index() {
    let store = CountingStore::new();
    let orchestrator = orchestrator(&store).with_config(FixtureConfig {
        force_recreate: true,
        readiness: fast_poll(),
        propagation: fast_poll(),
        ..FixtureConfig::default()
    });
    let mut fixture = orchestrator.acquire_instance().unwrap();
    let handle = fixture.instance().cloned().unwrap();
    store
        .inner
        .create_index(&handle, "library", &Default::default())
        .unwrap();

    fixture.install_schema(&library_spec()).unwrap();
    fixture.verify().unwrap();
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.creates(), 1);
    assert_eq!(
        fixture.get_mapping("library", "book").unwrap(),
        Some(expected_book())
    );
}
