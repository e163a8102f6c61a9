//! Fixture Lifecycle Tests
//!
//! Teardown on every exit path: normal return, body error, panic, setup
//! failure. Teardown failures never replace the primary failure.

use crate::common::*;
use std::panic::{self, AssertUnwindSafe};
use strata_fixture::{compile_multi_field, TeardownFailure};

fn simple_spec(index: &str) -> IndexSpec {
    IndexSpec::new(index).mapping(
        TypeMapping::new("doc").field(FieldSpec::new("body", FieldType::String)),
    )
}

// ============================================================================
// Idempotent teardown
// ============================================================================

#[test]
fn teardown_twice_issues_one_drop_and_one_stop() {
    let store = CountingStore::new();
    let mut fixture = orchestrator(&store).setup(&[simple_spec("notes")]).unwrap();

    fixture.teardown().unwrap();
    fixture.teardown().unwrap();
    drop(fixture);

    assert_eq!(store.deletes(), 1);
    assert_eq!(store.stops(), 1);
}

#[test]
fn indices_dropped_in_reverse_order() {
    let store = CountingStore::new();
    let mut fixture = orchestrator(&store)
        .setup(&[simple_spec("first"), simple_spec("second")])
        .unwrap();
    assert_eq!(
        fixture.installed_indices(),
        ["first".to_string(), "second".to_string()]
    );

    store.fail_deletes();
    let failure: TeardownFailure = fixture.teardown().unwrap_err();
    let resources: Vec<_> = failure.issues.iter().map(|i| i.resource.as_str()).collect();
    assert_eq!(resources, vec!["index 'second'", "index 'first'"]);
    assert_eq!(fixture.state(), FixtureState::TornDown);
}

// ============================================================================
// Exit paths
// ============================================================================

#[test]
fn panicking_body_still_tears_down() {
    let store = CountingStore::new();
    let orchestrator = orchestrator(&store);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        orchestrator.run(&[simple_spec("notes")], |_| -> Result<(), Error> {
            panic!("test body panicked");
        })
    }));

    assert!(result.is_err());
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.stops(), 1);
    assert_eq!(store.inner.running_instances(), 0);
    assert_eq!(orchestrator.registry().active_count(), 0);
}

#[test]
fn body_error_keeps_priority_over_teardown_failure() {
    let store = CountingStore::new();
    store.fail_stops();

    let err = orchestrator(&store)
        .run(&[simple_spec("notes")], |_| Err::<(), _>("expected 3 hits, got 0"))
        .unwrap_err();

    match err {
        Error::WithTeardown { source, teardown } => {
            assert!(matches!(*source, Error::Body(ref e) if e.to_string().contains("3 hits")));
            assert_eq!(teardown.len(), 1);
            assert!(teardown.issues[0].message.contains("injected stop failure"));
        }
        other => panic!("Wrong error variant: {:?}", other),
    }
}

#[test]
fn teardown_failure_after_passing_body_is_logged_only() {
    let store = CountingStore::new();
    store.fail_deletes();

    let value = orchestrator(&store)
        .run(&[simple_spec("notes")], |_| Ok::<_, Error>(42))
        .unwrap();
    assert_eq!(value, 42);
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.stops(), 1);
}

#[test]
fn strict_teardown_reports_failure() {
    let store = CountingStore::new();
    store.fail_deletes();
    let orchestrator = FixtureOrchestrator::builder()
        .backend(store.clone())
        .registry(std::sync::Arc::new(FixtureRegistry::new()))
        .readiness(fast_poll())
        .propagation(fast_poll())
        .strict_teardown()
        .build()
        .unwrap();

    let err = orchestrator
        .run(&[simple_spec("notes")], |_| Ok::<_, Error>(()))
        .unwrap_err();
    assert!(matches!(err, Error::Teardown(ref failure) if failure.len() == 1));
}

#[test]
fn readiness_timeout_stops_started_instance() {
    let store = CountingStore::slow(1_000);
    let mut ran = false;

    let err = orchestrator(&store)
        .run(&[simple_spec("notes")], |_| {
            ran = true;
            Ok::<_, Error>(())
        })
        .unwrap_err();

    assert!(!ran);
    match err {
        Error::InstanceUnavailable { attempts, .. } => assert_eq!(attempts, 5),
        other => panic!("Wrong error variant: {:?}", other),
    }
    assert_eq!(store.starts(), 1);
    assert_eq!(store.stops(), 1);
    assert_eq!(store.creates(), 0);
}

#[test]
fn compilation_failure_never_reaches_store() {
    let store = CountingStore::new();
    let bad = IndexSpec::new("notes").mapping(
        TypeMapping::new("doc").field(
            FieldSpec::new("body", FieldType::String)
                .analyzer("standard")
                .index_analyzer("keyword"),
        ),
    );

    let err = orchestrator(&store)
        .run(&[bad], |_| Ok::<_, Error>(()))
        .unwrap_err();
    assert!(err.is_compilation());
    assert!(matches!(err.root(), Error::ConflictingAnalyzers(ref f) if f == "body"));
    assert_eq!(store.starts(), 0);
}

#[test]
fn setup_failure_drops_partial_install() {
    let store = CountingStore::new();
    let orphan = IndexSpec::new("ratings").mapping(TypeMapping::new("rating").parent("book"));

    // Compilation of every spec happens first, so nothing is installed
    let err = orchestrator(&store)
        .setup(&[simple_spec("notes"), orphan])
        .unwrap_err();
    assert!(matches!(err.root(), Error::UnknownParentType { .. }));
    assert_eq!(store.creates(), 0);

    // A store-side failure after the first index: that index is dropped again
    let err = orchestrator(&store)
        .setup(&[simple_spec("notes"), simple_spec("notes")])
        .unwrap_err();
    assert!(matches!(err, Error::IndexAlreadyExists(_)));
    assert_eq!(store.creates(), 1);
    assert_eq!(store.deletes(), 1);
    assert_eq!(store.inner.running_instances(), 0);
}

// ============================================================================
// Multi-field isolation
// ============================================================================

#[test]
fn multi_field_members_are_isolated() {
    let group = |untouched: IndexMode| {
        MultiFieldGroup::new("name")
            .field(FieldSpec::new("name", FieldType::String).term_vector(TermVector::WithOffsets))
            .field(FieldSpec::new("untouched", FieldType::String).index(untouched))
    };

    let analyzed = compile_multi_field(&group(IndexMode::Analyzed)).unwrap();
    let not_indexed = compile_multi_field(&group(IndexMode::No)).unwrap();

    assert_eq!(analyzed["fields"]["name"], not_indexed["fields"]["name"]);
    assert!(analyzed["fields"]["untouched"].get("index").is_none());
    assert_eq!(not_indexed["fields"]["untouched"]["index"], "no");
}
