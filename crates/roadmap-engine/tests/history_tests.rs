use proptest::prelude::*;
use roadmap_dataset::{samples, GoalId};
use roadmap_engine::prelude::*;
use std::sync::Arc;

fn engine_with(config: EngineConfig) -> RoadmapEngine {
    RoadmapEngine::new(Arc::new(samples::career_tracks()), config, GoalId::from(samples::FRONTEND)).unwrap()
}

fn engine() -> RoadmapEngine {
    engine_with(EngineConfig::default())
}

#[test]
fn undo_and_redo_restore_exact_states() {
    let mut engine = engine();
    let empty = engine.state().clone();
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    let one = engine.state().clone();
    engine.apply(Intent::ToggleCompletion { id: html }).unwrap();
    let completed = engine.state().clone();

    assert!(engine.apply(Intent::Undo).unwrap().changed);
    assert_eq!(engine.state(), &one);
    engine.apply(Intent::Undo).unwrap();
    assert_eq!(engine.state(), &empty);
    assert!(!engine.can_undo());

    engine.apply(Intent::Redo).unwrap();
    engine.apply(Intent::Redo).unwrap();
    assert_eq!(engine.state(), &completed);
    assert!(!engine.can_redo());
}

#[test]
fn undo_on_empty_history_is_a_no_op() {
    let mut engine = engine();
    let outcome = engine.apply(Intent::Undo).unwrap();
    assert!(!outcome.changed);
    let outcome = engine.apply(Intent::Redo).unwrap();
    assert!(!outcome.changed);
}

#[test]
fn new_commit_clears_redo() {
    let mut engine = engine();
    engine.add_skill_after_rightmost("HTML").unwrap();
    engine.apply(Intent::Undo).unwrap();
    assert!(engine.can_redo());

    engine.add_skill_after_rightmost("Git").unwrap();
    assert!(!engine.can_redo());
}

#[test]
fn history_limit_drops_oldest_snapshots() {
    let mut engine = engine_with(EngineConfig::default().with_history_limit(2));
    for name in ["HTML", "CSS", "JavaScript"] {
        engine.add_skill_after_rightmost(name).unwrap();
    }

    engine.apply(Intent::Undo).unwrap();
    engine.apply(Intent::Undo).unwrap();
    assert!(!engine.can_undo());
    // The first add is out of reach
    assert_eq!(engine.roadmap().skill_count(), 1);
    assert!(engine.roadmap().skill_by_name("HTML").is_some());
}

#[test]
fn goal_switch_is_one_undo_step() {
    let mut engine = engine();
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    engine
        .apply(Intent::SwitchGoal {
            goal: GoalId::from(samples::BACKEND),
            trigger: Some(Trigger::cross_goal("SQL")),
        })
        .unwrap();
    assert_eq!(engine.active_goal(), &GoalId::from(samples::BACKEND));

    engine.apply(Intent::Undo).unwrap();
    assert_eq!(engine.active_goal(), &GoalId::from(samples::FRONTEND));
    assert!(engine.roadmap().skill(html).is_some());
    assert!(engine.archive().is_empty());
}

#[test]
fn selection_and_folding_are_not_history() {
    let mut engine = engine();
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    engine
        .apply(Intent::Select {
            ids: vec![html],
            additive: false,
        })
        .unwrap();
    engine.apply(Intent::ToggleFold { skill: html }).unwrap();

    engine.apply(Intent::Undo).unwrap();
    assert!(engine.roadmap().is_empty());
    // Stale ids are pruned from the view state
    assert!(engine.selection().is_empty());
    assert!(engine.folded().is_empty());
    assert!(!engine.can_undo());
}

#[test]
fn undo_restores_the_last_completed_skill() {
    let mut engine = engine();
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    engine.apply(Intent::ToggleCompletion { id: html }).unwrap();
    assert_eq!(engine.snapshot().completed_skill.as_deref(), Some("HTML"));

    engine.apply(Intent::Undo).unwrap();
    assert!(!engine.roadmap().skill(html).unwrap().completed);
    assert_eq!(engine.snapshot().completed_skill, None);

    engine.apply(Intent::Redo).unwrap();
    assert_eq!(engine.snapshot().completed_skill.as_deref(), Some("HTML"));
}

proptest! {
    #[test]
    fn prop_undo_all_returns_to_start(
        names in proptest::collection::vec(
            prop_oneof![Just("HTML"), Just("CSS"), Just("JavaScript"), Just("Git")],
            1..12
        )
    ) {
        let mut engine = engine();
        let start = engine.state().clone();
        let mut commits = 0;
        for name in names {
            if engine.add_skill_after_rightmost(name).unwrap().changed {
                commits += 1;
            }
        }
        let end = engine.state().clone();

        for _ in 0..commits {
            prop_assert!(engine.apply(Intent::Undo).unwrap().changed);
        }
        prop_assert_eq!(engine.state(), &start);
        prop_assert!(!engine.can_undo());

        for _ in 0..commits {
            engine.apply(Intent::Redo).unwrap();
        }
        prop_assert_eq!(engine.state(), &end);
    }
}
