//! Instance Policy Tests
//!
//! Exclusive instances per thread, and the opt-in shared instance policy.

use crate::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

fn shared_orchestrator(
    store: &Arc<CountingStore>,
    registry: &Arc<FixtureRegistry>,
) -> FixtureOrchestrator {
    init_tracing();
    FixtureOrchestrator::builder()
        .backend(store.clone())
        .registry(registry.clone())
        .shared("suite")
        .readiness(fast_poll())
        .propagation(fast_poll())
        .build()
        .unwrap()
}

fn spec(index: &str) -> IndexSpec {
    IndexSpec::new(index)
        .mapping(TypeMapping::new("doc").field(FieldSpec::new("body", FieldType::String)))
}

#[test]
fn concurrent_exclusive_fixtures_are_isolated() {
    const THREADS: usize = 8;
    let store = CountingStore::new();
    let orchestrator = orchestrator(&store);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let orchestrator = orchestrator.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                // Same index name everywhere: each fixture has its own instance
                orchestrator.run(&[spec("library")], |fixture| {
                    barrier.wait();
                    fixture.index_exists("library")
                })
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().unwrap());
    }
    assert_eq!(store.starts(), THREADS);
    assert_eq!(store.stops(), THREADS);
    assert_eq!(store.inner.running_instances(), 0);
    assert_eq!(orchestrator.registry().active_count(), 0);
}

#[test]
fn shared_instance_started_once_across_threads() {
    const THREADS: usize = 6;
    let store = CountingStore::new();
    let registry = Arc::new(FixtureRegistry::new());
    let orchestrator = shared_orchestrator(&store, &registry);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let index = format!("library-{}", i);
                orchestrator.run(&[spec(&index)], |fixture| {
                    // Every fixture is live at the same time
                    barrier.wait();
                    Ok::<_, Error>(fixture.instance().cloned())
                })
            })
        })
        .collect();

    let instances: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap().unwrap())
        .collect();
    assert!(instances.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.starts(), 1);
    assert_eq!(store.stops(), 0);
    assert_eq!(store.deletes(), THREADS);
    assert_eq!(registry.shared_instances(), vec![("suite".to_string(), 0)]);

    registry.shutdown_shared().unwrap();
    assert_eq!(store.stops(), 1);
    assert!(registry.shared_instances().is_empty());
}

#[test]
fn shared_instance_reused_by_later_fixture() {
    let store = CountingStore::new();
    let registry = Arc::new(FixtureRegistry::new());
    let orchestrator = shared_orchestrator(&store, &registry);

    let first = orchestrator
        .run(&[spec("notes")], |fixture| Ok::<_, Error>(fixture.instance().cloned()))
        .unwrap();
    let second = orchestrator
        .run(&[spec("notes")], |fixture| Ok::<_, Error>(fixture.instance().cloned()))
        .unwrap();

    // Index was dropped by the first fixture, so the second can install it again
    assert_eq!(first, second);
    assert_eq!(store.starts(), 1);
    assert_eq!(store.creates(), 2);
}

#[test]
fn live_fixtures_cannot_share_an_index_name() {
    let store = CountingStore::new();
    let registry = Arc::new(FixtureRegistry::new());
    let orchestrator = shared_orchestrator(&store, &registry);

    let holder = orchestrator.setup(&[spec("notes")]).unwrap();
    let err = orchestrator.setup(&[spec("notes")]).unwrap_err();
    assert!(matches!(err, Error::IndexAlreadyExists(ref name) if name == "notes"));

    // The failed fixture returned its lease; the holder's is still out
    assert_eq!(registry.shared_instances(), vec![("suite".to_string(), 1)]);
    assert_eq!(holder.state(), FixtureState::Verified);
    drop(holder);
    assert_eq!(registry.shared_instances(), vec![("suite".to_string(), 0)]);
}

#[test]
fn shared_instance_that_never_became_ready_is_stopped() {
    let store = CountingStore::slow(1_000);
    let registry = Arc::new(FixtureRegistry::new());
    let orchestrator = shared_orchestrator(&store, &registry);

    let err = orchestrator.run(&[spec("notes")], |_| Ok::<_, Error>(())).unwrap_err();
    assert!(matches!(err, Error::InstanceUnavailable { .. }));
    assert_eq!(store.stops(), 1);
    assert!(registry.shared_instances().is_empty());
}

#[test]
fn shared_name_on_separate_backends_starts_separate_instances() {
    let registry = Arc::new(FixtureRegistry::new());
    let store_a = CountingStore::new();
    let store_b = CountingStore::new();
    let on_a = shared_orchestrator(&store_a, &registry);
    let on_b = shared_orchestrator(&store_b, &registry);

    let a = on_a
        .run(&[spec("notes")], |fixture| Ok::<_, Error>(fixture.instance().cloned()))
        .unwrap();
    let b = on_b
        .run(&[spec("notes")], |fixture| Ok::<_, Error>(fixture.instance().cloned()))
        .unwrap();

    assert_ne!(a, b);
    assert_eq!(store_a.starts(), 1);
    assert_eq!(store_b.starts(), 1);
    assert_eq!(
        registry.shared_instances(),
        vec![("suite".to_string(), 0), ("suite".to_string(), 0)]
    );

    // Each instance is stopped by the backend that started it
    registry.shutdown_shared().unwrap();
    assert_eq!(store_a.stops(), 1);
    assert_eq!(store_b.stops(), 1);
    assert_eq!(store_a.inner.running_instances(), 0);
    assert_eq!(store_b.inner.running_instances(), 0);
    assert!(registry.shared_instances().is_empty());
}
