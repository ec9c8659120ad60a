//! Goal Switch Reconciler
//!
//! Moves the engine between goals: the outgoing roadmap goes to the archive,
//! the incoming one is restored (or started empty) and filtered against the
//! incoming goal's skill table. Skills discovered elsewhere, by a click on
//! another goal's roadmap or by a CV import, are spliced into the chain
//! afterwards.

use crate::completion;
use crate::config::LayoutConfig;
use crate::error::Rejection;
use crate::invariants;
use crate::store::{placement, GraphState, Roadmap, Suggestion};
use crate::types::{ConnectionType, ConnectorId, ConnectorKind, NodeId, NodeOrigin, Position};
use roadmap_dataset::{Dataset, GoalId, Resolved};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where an externally discovered skill came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerSource {
    /// The user clicked the skill on another goal's roadmap
    CrossGoal,
    /// The skill was extracted from the user's CV
    CvImport,
}

impl TriggerSource {
    /// Origin recorded on nodes created for this trigger
    #[inline]
    #[must_use]
    pub fn origin(self) -> NodeOrigin {
        match self {
            Self::CrossGoal => NodeOrigin::CrossGoal,
            Self::CvImport => NodeOrigin::CvImport,
        }
    }

    /// Whether the trigger counts as evidence the user already knows it
    #[inline]
    #[must_use]
    pub fn is_external_import(self) -> bool {
        matches!(self, Self::CvImport)
    }
}

/// Skill or tool name to splice into the active roadmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Skill or tool name
    pub name: String,
    /// Where it came from
    pub source: TriggerSource,
}

impl Trigger {
    /// Trigger from a cross-goal click
    #[must_use]
    pub fn cross_goal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: TriggerSource::CrossGoal,
        }
    }

    /// Trigger from a CV import
    #[must_use]
    pub fn cv_import(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: TriggerSource::CvImport,
        }
    }
}

/// What the validation pass filtered out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Skills dropped
    pub skills: usize,
    /// Tools dropped
    pub tools: usize,
    /// Connectors dropped
    pub connectors: usize,
    /// Skills whose level was refreshed from the dataset
    pub relevelled: usize,
}

impl PruneReport {
    /// Whether nothing was filtered
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a goal switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    /// Outgoing goal
    pub from: GoalId,
    /// Incoming goal
    pub to: GoalId,
    /// Whether the incoming roadmap came from the archive
    pub restored: bool,
    /// Validation pass result
    pub pruned: PruneReport,
}

/// Result of splicing a trigger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceReport {
    /// Nodes created
    pub created: Vec<NodeId>,
    /// Nodes marked complete
    pub completed: Vec<NodeId>,
    /// Archived goals that received the completion
    pub propagated_to: Vec<GoalId>,
    /// Trigger skipped because the user removed that CV skill before
    pub ignored: bool,
}

/// Archive the active roadmap and activate `target`
///
/// Returns `Ok(None)` when `target` is already active.
///
/// # Errors
/// Returns [`Rejection::UnknownGoal`] when the dataset lacks `target`
pub fn switch_goal(
    state: &mut GraphState,
    dataset: &Dataset,
    target: &GoalId,
) -> Result<Option<SwitchReport>, Rejection> {
    if state.active_goal() == target {
        tracing::debug!(goal = %target, "already on goal");
        return Ok(None);
    }
    let goal = dataset
        .goal(target)
        .ok_or_else(|| Rejection::UnknownGoal(target.clone()))?;

    let archived = state.take_archived(target);
    let restored = archived.is_some();
    let mut incoming = archived.unwrap_or_else(|| Roadmap::new(target.clone()));
    let pruned = validate_roadmap(&mut incoming, goal);

    let from = state.active_goal().clone();
    state.swap_active(incoming);
    state.set_suggestion(None);

    tracing::info!(
        from = %from,
        to = %target,
        restored,
        pruned_skills = pruned.skills,
        pruned_tools = pruned.tools,
        "goal switched"
    );
    Ok(Some(SwitchReport {
        from,
        to: target.clone(),
        restored,
        pruned,
    }))
}

/// Silently drop everything that no longer belongs to the goal
///
/// Skills missing from the skill table, tools no longer listed under their
/// parent and connectors with unresolvable or mismatched endpoints are
/// removed; stored levels are refreshed. The roadmap comes out satisfying
/// every structural invariant.
pub fn validate_roadmap(roadmap: &mut Roadmap, goal: &roadmap_dataset::Goal) -> PruneReport {
    let mut report = PruneReport::default();
    let goal_id = roadmap.goal_id().clone();

    let before = roadmap.skill_count();
    let mut names = HashSet::new();
    let mut relevelled = 0;
    roadmap.retain_skills(|_, skill| {
        let Some(level) = goal.level_of(&skill.name) else {
            return false;
        };
        if skill.goal_id != goal_id || !names.insert(skill.name.clone()) {
            return false;
        }
        if skill.level != level {
            skill.level = level;
            relevelled += 1;
        }
        true
    });
    report.skills = before - roadmap.skill_count();
    report.relevelled = relevelled;

    let parents: HashMap<NodeId, String> = roadmap.skills().map(|s| (s.id, s.name.clone())).collect();
    let before = roadmap.tool_count();
    let mut owned = HashSet::new();
    roadmap.retain_tools(|_, tool| {
        parents
            .get(&tool.parent_skill_id)
            .is_some_and(|parent| goal.lists_tool(parent, &tool.name))
            && owned.insert((tool.parent_skill_id, tool.name.clone()))
    });
    report.tools = before - roadmap.tool_count();

    let mut pairs = HashSet::new();
    let stale: Vec<ConnectorId> = roadmap
        .connectors()
        .filter(|c| {
            let valid = match roadmap.connector_kind(c) {
                ConnectorKind::Invalid => false,
                ConnectorKind::SkillToTool => roadmap
                    .tool(c.target_id)
                    .is_some_and(|t| t.parent_skill_id == c.source_id),
                ConnectorKind::SkillToSkill => true,
            };
            !(valid && pairs.insert(c.endpoints()))
        })
        .map(|c| c.id)
        .collect();
    for id in &stale {
        roadmap.remove_connector(*id);
    }
    report.connectors = stale.len();

    let unowned: Vec<(NodeId, NodeId)> = roadmap
        .tools()
        .filter(|t| roadmap.connector_between(t.parent_skill_id, t.id).is_none())
        .map(|t| (t.parent_skill_id, t.id))
        .collect();
    for (parent, tool) in unowned {
        roadmap.connect(parent, tool, ConnectionType::Normal);
    }
    invariants::reconcile(roadmap);

    if !report.is_clean() {
        tracing::debug!(
            goal = %goal_id,
            skills = report.skills,
            tools = report.tools,
            connectors = report.connectors,
            relevelled = report.relevelled,
            "stale elements filtered"
        );
    }
    report
}

/// Insert an externally discovered skill or tool into the active roadmap
///
/// A skill is placed after the rightmost node unless already present. A tool
/// is attached under its dataset parent, which is created first if needed.
/// CV imports additionally complete the imported item and reveal the
/// successor level; cross-goal clicks only insert.
///
/// # Errors
/// Returns [`Rejection::UnknownSkill`] when the name is neither a skill nor a
/// tool of the active goal
pub fn splice_trigger(
    state: &mut GraphState,
    dataset: &Dataset,
    layout: &LayoutConfig,
    trigger: &Trigger,
) -> Result<SpliceReport, Rejection> {
    let goal_id = state.active_goal().clone();
    let goal = dataset
        .goal(&goal_id)
        .ok_or_else(|| Rejection::UnknownGoal(goal_id.clone()))?;
    let mut report = SpliceReport::default();

    if trigger.source == TriggerSource::CvImport && state.removed_cv_skills().contains(&trigger.name) {
        tracing::debug!(name = %trigger.name, "ignoring CV skill the user removed");
        report.ignored = true;
        return Ok(report);
    }

    let resolved = goal.resolve(&trigger.name).ok_or_else(|| Rejection::UnknownSkill {
        goal: goal_id.clone(),
        name: trigger.name.clone(),
    })?;
    let origin = trigger.source.origin();
    let import = trigger.source.is_external_import();

    match resolved {
        Resolved::Skill { name, .. } => {
            let roadmap = state.active_mut();
            let id = match roadmap.skill_by_name(name).map(|s| s.id) {
                Some(existing) => existing,
                None => {
                    let at = placement::after_rightmost(roadmap, layout);
                    let id = roadmap
                        .materialize_skill(goal, name, at, origin, layout)?
                        .ok_or_else(|| Rejection::UnknownSkill {
                            goal: goal_id.clone(),
                            name: name.to_string(),
                        })?;
                    report.created.push(id);
                    id
                }
            };
            if import {
                if let Some(skill) = roadmap.skill_mut(id).filter(|s| !s.completed) {
                    skill.completed = true;
                    report.completed.push(id);
                }
                report.created.extend(completion::reveal_next(roadmap, goal, layout, id)?);
                report.propagated_to = completion::propagate_by_name(state.archive_mut(), &goal_id, name);
            }
        }
        Resolved::Tool { name, parent } => {
            let roadmap = state.active_mut();
            let parent_id = match roadmap.skill_by_name(parent).map(|s| s.id) {
                Some(existing) => existing,
                None => {
                    // Only the imported tool carries the trigger's origin
                    let at = placement::after_rightmost(roadmap, layout);
                    let id = roadmap
                        .add_skill(goal, parent, at, layout.skill_size, NodeOrigin::Materialized)?
                        .ok_or_else(|| Rejection::UnknownSkill {
                            goal: goal_id.clone(),
                            name: parent.to_string(),
                        })?;
                    report.created.push(id);
                    id
                }
            };
            let tool_id = match roadmap.tool_by_name(parent_id, name).map(|t| t.id) {
                Some(existing) => existing,
                None => {
                    let (position, size) = roadmap
                        .skill(parent_id)
                        .map_or((Position::default(), layout.skill_size), |s| (s.position, s.size));
                    let slot = placement::tool_slot(position, size, roadmap.tools_of(parent_id).count(), layout);
                    let id = roadmap
                        .add_tool(goal, parent_id, name, slot, layout.tool_size)?
                        .ok_or(Rejection::NodeNotFound(parent_id))?;
                    report.created.push(id);
                    id
                }
            };
            if import {
                if let Some(tool) = roadmap.tool_mut(tool_id).filter(|t| !t.completed) {
                    tool.completed = true;
                    report.completed.push(tool_id);
                }
                report.created.extend(completion::reveal_next(roadmap, goal, layout, parent_id)?);
            }
        }
    }

    invariants::reconcile(state.active_mut());
    tracing::info!(
        name = %trigger.name,
        source = ?trigger.source,
        created = report.created.len(),
        "trigger spliced"
    );
    Ok(report)
}

/// Completed skills of `from` that the active goal has but its roadmap lacks
#[must_use]
pub fn common_completed_skills(state: &GraphState, dataset: &Dataset, from: &GoalId) -> Option<Suggestion> {
    let target = state.active_goal();
    if from == target {
        return None;
    }
    let goal = dataset.goal(target)?;
    let outgoing = state.roadmap_for(from)?;

    let skills: Vec<String> = outgoing
        .skills()
        .filter(|s| s.completed && goal.has_skill(&s.name))
        .filter(|s| state.active().skill_by_name(&s.name).is_none())
        .map(|s| s.name.clone())
        .collect();
    if skills.is_empty() {
        return None;
    }
    tracing::debug!(from = %from, to = %target, count = skills.len(), "common completed skills found");
    Some(Suggestion {
        from: from.clone(),
        to: target.clone(),
        skills,
    })
}

/// Add the suggested skills as completed nodes
///
/// A suggestion made for another goal is stale and dropped. Returns the
/// nodes created.
///
/// # Errors
/// Propagates admission errors
pub fn accept_suggestion(
    state: &mut GraphState,
    dataset: &Dataset,
    layout: &LayoutConfig,
) -> Result<Vec<NodeId>, Rejection> {
    let Some(suggestion) = state.take_suggestion() else {
        return Ok(Vec::new());
    };
    if suggestion.to != *state.active_goal() {
        tracing::debug!(to = %suggestion.to, "dropping stale suggestion");
        return Ok(Vec::new());
    }
    let goal = dataset
        .goal(&suggestion.to)
        .ok_or_else(|| Rejection::UnknownGoal(suggestion.to.clone()))?;

    let mut created = Vec::new();
    let mut accepted = Vec::new();
    for name in &suggestion.skills {
        let roadmap = state.active_mut();
        let at = placement::after_rightmost(roadmap, layout);
        if let Some(id) = roadmap.materialize_skill(goal, name, at, NodeOrigin::CrossGoal, layout)? {
            if let Some(skill) = roadmap.skill_mut(id) {
                skill.completed = true;
            }
            created.push(id);
            accepted.push(id);
        }
    }
    for id in accepted {
        created.extend(completion::reveal_next(state.active_mut(), goal, layout, id)?);
    }
    for name in &suggestion.skills {
        completion::propagate_by_name(state.archive_mut(), &suggestion.to, name);
    }
    invariants::reconcile(state.active_mut());
    tracing::info!(goal = %suggestion.to, count = created.len(), "suggestion accepted");
    Ok(created)
}
