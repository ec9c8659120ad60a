//! Completion Propagator
//!
//! Completing a skill marks the same skill name complete in every other goal
//! roadmap and reveals the next level of the active goal. Tools only ever
//! flip themselves.

use crate::config::LayoutConfig;
use crate::error::Rejection;
use crate::invariants;
use crate::store::{placement, GraphState, Roadmap};
use crate::types::{ConnectionType, NodeId, NodeOrigin, Position};
use indexmap::IndexMap;
use roadmap_dataset::{Dataset, Goal, GoalId, SkillKey};

/// What a completion toggle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    /// Toggled node
    pub node: NodeId,
    /// Whether the node is a tool
    pub is_tool: bool,
    /// New flag value
    pub completed: bool,
    /// Key of the skill that just became complete
    pub completed_skill: Option<SkillKey>,
    /// Archived goals whose same-named skill was completed as well
    pub propagated_to: Vec<GoalId>,
    /// Nodes created by revealing the next level
    pub materialized: Vec<NodeId>,
}

/// Flip the completion flag of a node on the active roadmap
///
/// Uncompleting is local to the node; only the transition to completed
/// propagates and reveals.
///
/// # Errors
/// Returns error if the node is not on the active roadmap or the active goal
/// is missing from the dataset
pub fn toggle(
    state: &mut GraphState,
    dataset: &Dataset,
    layout: &LayoutConfig,
    node: NodeId,
) -> Result<CompletionReport, Rejection> {
    let goal_id = state.active_goal().clone();
    let goal = dataset
        .goal(&goal_id)
        .ok_or_else(|| Rejection::UnknownGoal(goal_id.clone()))?;

    if let Some(tool) = state.active_mut().tool_mut(node) {
        tool.completed = !tool.completed;
        return Ok(CompletionReport {
            node,
            is_tool: true,
            completed: tool.completed,
            completed_skill: None,
            propagated_to: Vec::new(),
            materialized: Vec::new(),
        });
    }

    let skill = state
        .active_mut()
        .skill_mut(node)
        .ok_or(Rejection::NodeNotFound(node))?;
    skill.completed = !skill.completed;
    let completed = skill.completed;
    let name = skill.name.clone();

    let mut report = CompletionReport {
        node,
        is_tool: false,
        completed,
        completed_skill: None,
        propagated_to: Vec::new(),
        materialized: Vec::new(),
    };
    if !completed {
        return Ok(report);
    }

    report.propagated_to = propagate_by_name(state.archive_mut(), &goal_id, &name);
    report.materialized = reveal_next(state.active_mut(), goal, layout, node)?;
    report.completed_skill = Some(SkillKey::new(goal_id, name));
    Ok(report)
}

/// Complete `name` on every roadmap except `except`'s
///
/// Returns the goals that changed.
pub fn propagate_by_name(
    archive: &mut IndexMap<GoalId, Roadmap>,
    except: &GoalId,
    name: &str,
) -> Vec<GoalId> {
    let mut touched = Vec::new();
    for (goal, roadmap) in archive.iter_mut() {
        if goal == except {
            continue;
        }
        if let Some(skill) = roadmap.skill_by_name_mut(name) {
            if !skill.completed {
                skill.completed = true;
                touched.push(goal.clone());
            }
        }
    }
    if !touched.is_empty() {
        tracing::debug!(skill = name, goals = touched.len(), "completion propagated");
    }
    touched
}

/// Materialize the skills of the next dataset level beside `skill`
///
/// Skills already on the roadmap are only rewired. Each new skill brings
/// the tools the dataset lists for it. Running this twice creates nothing
/// the second time.
///
/// # Errors
/// Returns [`Rejection::NodeNotFound`] if `skill` is not a skill of the roadmap
pub fn reveal_next(
    roadmap: &mut Roadmap,
    goal: &Goal,
    layout: &LayoutConfig,
    skill: NodeId,
) -> Result<Vec<NodeId>, Rejection> {
    let anchor = roadmap.skill(skill).ok_or(Rejection::NodeNotFound(skill))?;
    let (level, position, size) = (anchor.level, anchor.position, anchor.size);

    let Some(next) = goal.next_level_above(level) else {
        return Ok(Vec::new());
    };
    let missing: Vec<String> = goal
        .skills_at_level(next)
        .filter(|(name, _)| roadmap.skill_by_name(name).is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    let mut created = Vec::new();
    for (slot, name) in missing.iter().enumerate() {
        let at = placement::beside(position, size, slot, layout);
        if let Some(id) = roadmap.materialize_skill(goal, name, at, NodeOrigin::Materialized, layout)? {
            created.push(id);
        }
    }
    invariants::reconcile(roadmap);

    if !created.is_empty() {
        tracing::info!(goal = %goal.id, level = next, count = created.len(), "next level revealed");
    }
    Ok(created)
}

/// Materialize every skill of the goal, one column per level
///
/// Returns the skills created; their tools come along. Consecutive levels
/// are connected bipartite-style and skills already on the roadmap keep
/// their position.
///
/// # Errors
/// Propagates admission errors, which only occur on an inconsistent goal
#[allow(clippy::cast_precision_loss)]
pub fn auto_build(roadmap: &mut Roadmap, goal: &Goal, layout: &LayoutConfig) -> Result<Vec<NodeId>, Rejection> {
    let column = layout.skill_size.width + layout.column_gap;
    let row = layout.skill_size.height + layout.tool_size.height + 2.0 * layout.row_gap;
    let levels = goal.levels();

    let mut created = Vec::new();
    for (col, level) in levels.iter().enumerate() {
        let names: Vec<String> = goal.skills_at_level(*level).map(|(n, _)| n.to_string()).collect();
        for (line, name) in names.iter().enumerate() {
            let at = Position::new(column * col as f64, row * line as f64);
            if let Some(id) = roadmap.materialize_skill(goal, name, at, NodeOrigin::Materialized, layout)? {
                created.push(id);
            }
        }
    }

    for pair in levels.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        let sources: Vec<NodeId> = roadmap.skills().filter(|s| s.level == lower).map(|s| s.id).collect();
        let targets: Vec<NodeId> = roadmap.skills().filter(|s| s.level == upper).map(|s| s.id).collect();
        for source in &sources {
            for target in &targets {
                roadmap.connect(*source, *target, ConnectionType::for_gap(upper - lower));
            }
        }
    }
    invariants::reconcile(roadmap);

    tracing::info!(goal = %goal.id, created = created.len(), "roadmap auto-built");
    Ok(created)
}
