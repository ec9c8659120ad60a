use roadmap_dataset::{samples, GoalId};
use roadmap_engine::invariants;
use roadmap_engine::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn engine_on(goal: &str) -> RoadmapEngine {
    RoadmapEngine::new(Arc::new(samples::career_tracks()), EngineConfig::default(), GoalId::from(goal)).unwrap()
}

fn skill(goal: &str, name: &str, level: u32) -> SkillNode {
    let size = LayoutConfig::default().skill_size;
    SkillNode::new(GoalId::from(goal), name, level, Position::default(), size)
}

fn assert_clean(engine: &RoadmapEngine) {
    let goal = engine.dataset().goal(engine.active_goal()).unwrap();
    let violations = invariants::audit(engine.roadmap(), goal);
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn unknown_names_are_rejected() {
    let mut engine = engine_on(samples::FRONTEND);
    let err = engine.add_skill_after_rightmost("COBOL").unwrap_err();
    assert!(matches!(err, Rejection::UnknownSkill { .. }));

    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    let err = engine
        .apply(Intent::AddNode {
            name: "Sass".into(),
            position: Position::default(),
            parent: Some(html),
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::UnknownTool { .. }));
    assert_eq!(engine.roadmap().tool_count(), 0);
}

#[test]
fn batch_merges_duplicates_and_wires_tools() {
    let mut engine = engine_on(samples::FRONTEND);
    let existing = engine.add_skill_after_rightmost("HTML").unwrap().created[0];

    // A second HTML gets folded into the one already present
    let html = skill(samples::FRONTEND, "HTML", 1);
    let css = skill(samples::FRONTEND, "CSS", 9);
    let vscode = ToolNode::new("VS Code", html.id, Position::default(), LayoutConfig::default().tool_size);
    let link = Connector::new(html.id, css.id, ConnectionType::Warning);
    let css_id = css.id;

    let outcome = engine
        .apply(Intent::AddNodes {
            elements: vec![
                Element::Skill(html),
                Element::Skill(css),
                Element::Tool(vscode),
                Element::Connector(link),
            ],
        })
        .unwrap();
    assert_eq!(outcome.created.len(), 2);

    let roadmap = engine.roadmap();
    assert_eq!(roadmap.skill_count(), 2);
    assert_eq!(roadmap.skill(css_id).unwrap().level, 2);
    assert_eq!(roadmap.tools_of(existing).count(), 1);
    let edge = roadmap.connector_between(existing, css_id).unwrap();
    assert_eq!(edge.connection_type, ConnectionType::Normal);
    assert_clean(&engine);
}

#[test]
fn batch_from_another_goal_is_refused_whole() {
    let mut engine = engine_on(samples::FRONTEND);
    engine.add_skill_after_rightmost("HTML").unwrap();
    let before = engine.state().clone();

    let err = engine
        .apply(Intent::AddNodes {
            elements: vec![
                Element::Skill(skill(samples::FRONTEND, "CSS", 2)),
                Element::Skill(skill(samples::BACKEND, "SQL", 2)),
            ],
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::GoalMismatch { .. }));
    assert_eq!(engine.state(), &before);
}

#[test]
fn removing_a_skill_cascades_upward() {
    let mut engine = engine_on(samples::FRONTEND);
    engine.apply(Intent::AutoBuild).unwrap();
    let css = engine.roadmap().skill_by_name("CSS").unwrap().id;

    let removed = engine.apply(Intent::RemoveNode { id: css }).unwrap().removed;
    let roadmap = engine.roadmap();
    assert!(roadmap.skill_by_name("JavaScript").is_none());
    assert!(roadmap.skill_by_name("HTML").is_some());
    assert!(roadmap.skill_by_name("Git").is_some());
    // CSS, JavaScript and their three tools
    assert_eq!(removed.len(), 5);
    assert_clean(&engine);
}

#[test]
fn last_skill_cannot_be_removed() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    engine.add_skill_after_rightmost("CSS").unwrap();

    // HTML takes CSS along, which would empty the roadmap
    let err = engine.apply(Intent::RemoveNode { id: html }).unwrap_err();
    assert_eq!(err, Rejection::LastSkill);
    assert_eq!(engine.roadmap().skill_count(), 2);
}

#[test]
fn auto_build_lays_out_every_skill() {
    let mut engine = engine_on(samples::DEVOPS);
    let created = engine.apply(Intent::AutoBuild).unwrap().created;
    assert_eq!(created.len(), 4);
    assert_eq!(engine.roadmap().tool_count(), 6);
    // Linux -> Git -> Docker -> Kubernetes, plus one connector per tool
    assert_eq!(engine.roadmap().connector_count(), 3 + 6);
    assert_clean(&engine);

    let again = engine.apply(Intent::AutoBuild).unwrap();
    assert!(again.created.is_empty());
    assert!(!again.changed);
}

#[test]
fn moving_a_skill_carries_its_tools() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    let tool = engine
        .apply(Intent::AddNode {
            name: "VS Code".into(),
            position: Position::new(10.0, 100.0),
            parent: Some(html),
        })
        .unwrap()
        .created[0];

    let outcome = engine
        .apply(Intent::MoveNodes {
            ids: vec![html, NodeId::new()],
            delta: Offset::new(30.0, -10.0),
        })
        .unwrap();
    assert_eq!(outcome.moved, vec![html, tool]);
    assert_eq!(engine.roadmap().tool(tool).unwrap().position, Position::new(40.0, 90.0));
}

#[test]
fn coalesced_drag_is_one_undo_step() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    let start = engine.roadmap().skill(html).unwrap().position;

    let mut coalescer = MoveCoalescer::new(Duration::from_millis(16));
    let t0 = Instant::now();
    let mut emitted = Vec::new();
    for step in 0..5u32 {
        let at = t0 + Duration::from_millis(u64::from(step) * 2);
        emitted.extend(coalescer.push(vec![html], Offset::new(1.0, 2.0), at));
    }
    emitted.extend(coalescer.flush());
    assert_eq!(emitted.len(), 1);

    for intent in emitted {
        engine.apply(intent).unwrap();
    }
    assert_eq!(
        engine.roadmap().skill(html).unwrap().position,
        start.translated(Offset::new(5.0, 10.0))
    );

    engine.apply(Intent::Undo).unwrap();
    assert_eq!(engine.roadmap().skill(html).unwrap().position, start);
}

#[test]
fn update_node_resizes_in_place() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    engine
        .apply(Intent::UpdateNode {
            id: html,
            patch: NodePatch {
                position: None,
                size: Some(Size::new(240.0, 80.0)),
            },
        })
        .unwrap();
    assert_eq!(engine.roadmap().skill(html).unwrap().size, Size::new(240.0, 80.0));

    let err = engine
        .apply(Intent::UpdateNode {
            id: NodeId::new(),
            patch: NodePatch::default(),
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::NodeNotFound(_)));
}

#[test]
fn non_finite_geometry_leaves_history_alone() {
    let mut engine = engine_on(samples::FRONTEND);
    let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
    let before = engine.state().clone();

    let err = engine
        .apply(Intent::UpdateNode {
            id: html,
            patch: NodePatch {
                position: Some(Position::new(f64::NAN, 0.0)),
                size: None,
            },
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::InvalidGeometry(_)));
    let err = engine
        .apply(Intent::MoveNodes {
            ids: vec![html],
            delta: Offset::new(f64::INFINITY, 0.0),
        })
        .unwrap_err();
    assert!(matches!(err, Rejection::InvalidGeometry(_)));
    assert_eq!(engine.state(), &before);

    // A no-op still compares equal and records nothing
    assert!(!engine.add_skill_after_rightmost("HTML").unwrap().changed);
    engine.apply(Intent::Undo).unwrap();
    assert!(!engine.can_undo());
}

#[test]
fn simulator_certifies_career_tracks() {
    let report = roadmap_engine::TestHarness::run_certification(3, 200);
    assert!(report.passed, "failed seeds: {:?}", report.failed_seeds);
    assert_eq!(report.seeds_tested, 3);
}
