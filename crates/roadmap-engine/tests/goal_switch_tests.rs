use pretty_assertions::assert_eq;
use roadmap_dataset::{samples, GoalId};
use roadmap_engine::prelude::*;
use std::sync::Arc;

fn engine_on(goal: &str) -> RoadmapEngine {
    RoadmapEngine::new(Arc::new(samples::career_tracks()), EngineConfig::default(), GoalId::from(goal)).unwrap()
}

fn add(engine: &mut RoadmapEngine, name: &str) -> NodeId {
    engine.add_skill_after_rightmost(name).unwrap().created[0]
}

fn switch(engine: &mut RoadmapEngine, goal: &str, trigger: Option<Trigger>) -> Outcome {
    engine
        .apply(Intent::SwitchGoal {
            goal: GoalId::from(goal),
            trigger,
        })
        .unwrap()
}

#[test]
fn switching_archives_and_restores() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = add(&mut engine, "HTML");

    let outcome = switch(&mut engine, samples::BACKEND, None);
    let report = outcome.switch.unwrap();
    assert_eq!(report.from, GoalId::from(samples::FRONTEND));
    assert!(!report.restored);
    assert!(engine.roadmap().is_empty());
    assert!(engine.archive().contains_key(&GoalId::from(samples::FRONTEND)));

    let report = switch(&mut engine, samples::FRONTEND, None).switch.unwrap();
    assert!(report.restored);
    assert!(report.pruned.is_clean());
    assert!(engine.roadmap().skill(html).is_some());
    assert!(engine.archive().contains_key(&GoalId::from(samples::BACKEND)));
}

#[test]
fn switching_to_the_active_goal_without_trigger_changes_nothing() {
    let mut engine = engine_on(samples::FRONTEND);
    add(&mut engine, "HTML");
    let outcome = switch(&mut engine, samples::FRONTEND, None);
    assert!(!outcome.changed);
    assert!(outcome.switch.is_none());
}

#[test]
fn unknown_goal_is_rejected() {
    let mut engine = engine_on(samples::FRONTEND);
    let err = engine
        .apply(Intent::SwitchGoal {
            goal: GoalId::from("astronaut"),
            trigger: None,
        })
        .unwrap_err();
    assert_eq!(err, Rejection::UnknownGoal(GoalId::from("astronaut")));
    assert_eq!(engine.active_goal(), &GoalId::from(samples::FRONTEND));
}

#[test]
fn completed_common_skills_are_suggested_and_accepted() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = add(&mut engine, "HTML");
    engine.apply(Intent::ToggleCompletion { id: html }).unwrap();

    let outcome = switch(&mut engine, samples::BACKEND, None);
    let suggestion = outcome.suggestion.unwrap();
    assert_eq!(suggestion.from, GoalId::from(samples::FRONTEND));
    assert_eq!(suggestion.to, GoalId::from(samples::BACKEND));
    assert_eq!(suggestion.skills, vec!["HTML".to_string()]);
    assert_eq!(engine.suggestion(), Some(&suggestion));

    let created = engine.apply(Intent::AcceptSuggestions).unwrap().created;
    assert!(engine.suggestion().is_none());

    let roadmap = engine.roadmap();
    let html = roadmap.skill_by_name("HTML").unwrap();
    assert!(html.completed);
    assert_eq!(html.origin, NodeOrigin::CrossGoal);
    // HTML plus the revealed level 2 of the backend track
    assert_eq!(created.len(), 3);
    for name in ["SQL", "HTTP"] {
        let next = roadmap.skill_by_name(name).unwrap();
        assert!(roadmap.connector_between(html.id, next.id).is_some());
    }
}

#[test]
fn dismissed_suggestion_leaves_roadmap_alone() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = add(&mut engine, "HTML");
    engine.apply(Intent::ToggleCompletion { id: html }).unwrap();
    switch(&mut engine, samples::BACKEND, None);
    assert!(engine.suggestion().is_some());

    engine.apply(Intent::DismissSuggestions).unwrap();
    assert!(engine.suggestion().is_none());
    assert!(engine.roadmap().is_empty());

    let outcome = engine.apply(Intent::AcceptSuggestions).unwrap();
    assert!(outcome.created.is_empty());
    assert!(!outcome.changed);
}

#[test]
fn cross_goal_click_only_inserts() {
    let mut engine = engine_on(samples::FRONTEND);
    add(&mut engine, "HTML");

    let outcome = switch(&mut engine, samples::BACKEND, Some(Trigger::cross_goal("SQL")));
    let splice = outcome.splice.unwrap();
    assert!(splice.completed.is_empty());
    assert!(!splice.ignored);

    let roadmap = engine.roadmap();
    let sql = roadmap.skill_by_name("SQL").unwrap();
    assert!(!sql.completed);
    assert_eq!(sql.origin, NodeOrigin::CrossGoal);
    assert_eq!(roadmap.tools_of(sql.id).count(), 2);
    assert!(roadmap.skill_by_name("Rust").is_none());
}

#[test]
fn cv_skill_import_completes_and_reveals() {
    let mut engine = engine_on(samples::BACKEND);
    let outcome = engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("SQL"),
        })
        .unwrap();
    let splice = outcome.splice.unwrap();
    assert_eq!(splice.completed.len(), 1);

    let roadmap = engine.roadmap();
    let sql = roadmap.skill_by_name("SQL").unwrap();
    assert!(sql.completed);
    assert_eq!(sql.origin, NodeOrigin::CvImport);
    let rust = roadmap.skill_by_name("Rust").unwrap();
    assert!(!rust.completed);
    assert!(roadmap.connector_between(sql.id, rust.id).is_some());
}

#[test]
fn cv_tool_import_reveals_above_the_parent() {
    let mut engine = engine_on(samples::BACKEND);
    engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("Cargo"),
        })
        .unwrap();

    let roadmap = engine.roadmap();
    let rust = roadmap.skill_by_name("Rust").unwrap();
    assert!(!rust.completed);
    let cargo = roadmap.tool_by_name(rust.id, "Cargo").unwrap();
    assert!(cargo.completed);

    let distributed = roadmap.skill_by_name("Distributed Systems").unwrap();
    let edge = roadmap.connector_between(rust.id, distributed.id).unwrap();
    assert_eq!(edge.connection_type, ConnectionType::Warning);
}

#[test]
fn removed_cv_skill_is_not_reimported_until_added_by_hand() {
    let mut engine = engine_on(samples::BACKEND);
    add(&mut engine, "Git");
    engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("SQL"),
        })
        .unwrap();

    let sql = engine.roadmap().skill_by_name("SQL").unwrap().id;
    let removed = engine.apply(Intent::RemoveNode { id: sql }).unwrap().removed;
    // Rust was revealed above SQL and goes with it, tools included
    assert!(removed.contains(&sql));
    assert!(engine.roadmap().skill_by_name("Rust").is_none());
    assert!(engine.state().removed_cv_skills().contains("SQL"));

    let outcome = engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("SQL"),
        })
        .unwrap();
    assert!(!outcome.changed);
    assert!(engine.roadmap().skill_by_name("SQL").is_none());

    add(&mut engine, "SQL");
    assert!(engine.state().removed_cv_skills().is_empty());
}

#[test]
fn unknown_trigger_rejects_the_whole_switch() {
    let mut engine = engine_on(samples::FRONTEND);
    add(&mut engine, "HTML");
    let before = engine.state().clone();

    let err = engine
        .apply(Intent::SwitchGoal {
            goal: GoalId::from(samples::BACKEND),
            trigger: Some(Trigger::cross_goal("Kubernetes")),
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::UnknownSkill { .. }));
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.active_goal(), &GoalId::from(samples::FRONTEND));
}

#[test]
fn parent_created_for_a_cv_tool_is_not_a_cv_skill() {
    let mut engine = engine_on(samples::BACKEND);
    add(&mut engine, "Git");
    engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("PostgreSQL"),
        })
        .unwrap();

    let sql = engine.roadmap().skill_by_name("SQL").unwrap();
    assert_eq!(sql.origin, NodeOrigin::Materialized);
    assert!(!sql.completed);
    let sql = sql.id;
    assert!(engine.roadmap().tool_by_name(sql, "PostgreSQL").unwrap().completed);

    engine.apply(Intent::RemoveNode { id: sql }).unwrap();
    assert!(engine.state().removed_cv_skills().is_empty());

    // A later CV import of the skill itself still goes through
    let outcome = engine
        .apply(Intent::ImportSkill {
            trigger: Trigger::cv_import("SQL"),
        })
        .unwrap();
    assert!(outcome.changed);
    let sql = engine.roadmap().skill_by_name("SQL").unwrap();
    assert!(sql.completed);
    assert_eq!(sql.origin, NodeOrigin::CvImport);
}

#[test]
fn accepted_suggestion_mirrors_completion_into_other_roadmaps() {
    let mut engine = engine_on(samples::FRONTEND);
    let git = add(&mut engine, "Git");
    engine.apply(Intent::ToggleCompletion { id: git }).unwrap();

    // DevOps gets its own, still incomplete, Git after the completion happened
    switch(&mut engine, samples::DEVOPS, None);
    engine.apply(Intent::DismissSuggestions).unwrap();
    add(&mut engine, "Git");
    switch(&mut engine, samples::FRONTEND, None);

    let outcome = switch(&mut engine, samples::BACKEND, None);
    assert_eq!(outcome.suggestion.unwrap().skills, vec!["Git".to_string()]);
    engine.apply(Intent::AcceptSuggestions).unwrap();

    assert!(engine.roadmap().skill_by_name("Git").unwrap().completed);
    let devops = engine.roadmap_for(&GoalId::from(samples::DEVOPS)).unwrap();
    assert!(devops.skill_by_name("Git").unwrap().completed);
}
