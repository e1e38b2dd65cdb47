//! Experiment lifecycle scenarios across the registry and controller.

use std::sync::Arc;

use serde_json::json;

use crate::*;

fn loaded(json: serde_json::Value, context: &EntityContext) -> Switchboard {
    let mut switchboard = Switchboard::new(context.clone());
    switchboard.load_configuration(&json);
    switchboard
}

#[test]
fn test_active_and_completed_are_exclusive() {
    let context = EntityContext::default();
    let exp = Experiment::with_cohort("exp", "A", &context).unwrap();

    for step in 0..4 {
        match step {
            1 => assert!(exp.start()),
            2 => assert!(exp.complete()),
            3 => exp.clear_state(),
            _ => {}
        }
        assert!(!(exp.is_active() && exp.is_completed()));
        assert_eq!(exp.is_entitled(), !exp.is_active() && !exp.is_completed());
    }
}

#[test]
fn test_completed_without_started_is_not_active() {
    let context = EntityContext::default();
    context.store().save(Some(true), "exp", keys::IS_COMPLETED);
    let exp = Experiment::with_cohort("exp", "A", &context).unwrap();

    assert!(exp.is_completed());
    assert!(!exp.is_active());
    assert_eq!(exp.state(), ExperimentState::Completed);
}

#[test]
fn test_deleted_experiment_restarts_from_entitled() {
    let context = EntityContext::default();
    let cache = MemorySnapshotCache::new();
    let mut switchboard = loaded(
        json!({"exp": {"values": {"cohort": "A"}, "isActive": true}}),
        &context,
    );
    assert!(switchboard.experiment("exp").unwrap().start());

    let mut controller = DebugController::new(&mut switchboard, &cache);
    let exp = controller.find_experiment("exp").unwrap().clone();
    controller.delete(&exp);
    assert!(controller.find_experiment("exp").is_none());

    let again = Experiment::with_cohort("exp", "B", &context).unwrap();
    assert_eq!(again.state(), ExperimentState::Entitled);
    controller.activate(again);
    assert!(controller.find_experiment("exp").unwrap().start());
}

#[test]
fn test_dependency_completed_through_registry() {
    let context = EntityContext::default();
    let switchboard = loaded(
        json!({
            "first": {"values": {"cohort": "A"}, "isActive": true},
            "second": {"values": {"cohort": "A"}, "isActive": true},
        }),
        &context,
    );
    let first = switchboard.experiment("first").unwrap();
    let mut second = switchboard.experiment("second").unwrap().clone();
    second.add_dependency(first.clone()).unwrap();

    assert!(!second.start());
    assert!(first.start());
    assert!(first.complete());
    assert!(second.start());
}

#[test]
fn test_gate_installed_after_creation_applies() {
    let context = EntityContext::default();
    let switchboard = loaded(
        json!({"exp": {"values": {"cohort": "A"}, "isActive": true}}),
        &context,
    );
    switchboard.prevent_experiments(|_| true);

    assert!(!switchboard.experiment("exp").unwrap().start());
    assert!(!switchboard.is_in("exp", true));
}

#[test]
fn test_state_survives_new_registry_with_same_store() {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let json = json!({"exp": {"values": {"cohort": "A"}, "isActive": true}});

    let first = loaded(json.clone(), &EntityContext::new(store.clone()));
    assert!(first.experiment("exp").unwrap().start());

    let second = loaded(json, &EntityContext::new(store));
    assert!(second.experiment("exp").unwrap().is_active());
}
