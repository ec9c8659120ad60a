//! Persistence plumbing
//!
//! After every committed intent the engine publishes a [`PersistedState`].
//! A tokio task hands the newest one to a [`PersistenceSink`]; failures are
//! logged and never reach the in-memory graph.

mod sink;
mod worker;

pub use sink::{JsonFileSink, MemorySink, PersistenceSink};
pub use worker::{spawn_persistence, PersistenceStats, SnapshotPublisher};

use crate::engine::ViewState;
use crate::error::{EngineError, PersistenceError};
use crate::reconcile::validate_roadmap;
use crate::store::{GraphState, Roadmap};
use crate::types::{Element, NodeId};
use indexmap::{IndexMap, IndexSet};
use roadmap_dataset::{Dataset, GoalId};
use serde::{Deserialize, Serialize};

/// Completion summary of one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProgress {
    /// Skill name
    pub name: String,
    /// Completion flag
    pub is_completed: bool,
    /// Goal holding the skill
    pub goal: GoalId,
    /// Completed tools under the skill
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed_tools: Vec<String>,
}

/// Serializable engine snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Completion summary across every roadmap
    #[serde(default)]
    pub skills: Vec<SkillProgress>,
    /// Elements per goal, active goal included
    #[serde(default)]
    pub roadmaps: IndexMap<GoalId, Vec<Element>>,
    /// Elements of the active goal
    #[serde(default)]
    pub canvas: Vec<Element>,
    /// Active goal
    pub selected_goal: GoalId,
    /// Skills whose tools are hidden
    #[serde(default)]
    pub folded_skills: Vec<NodeId>,
    /// CV skills the user deleted
    #[serde(default)]
    pub removed_cv_skills: Vec<String>,
    /// Skill most recently completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_skill: Option<String>,
}

impl PersistedState {
    /// Build a snapshot of the engine state
    #[must_use]
    pub fn capture(state: &GraphState, view: &ViewState, completed_skill: Option<&str>) -> Self {
        let skills = state
            .roadmaps()
            .flat_map(|roadmap| {
                roadmap.skills().map(move |skill| SkillProgress {
                    name: skill.name.clone(),
                    is_completed: skill.completed,
                    goal: roadmap.goal_id().clone(),
                    completed_tools: roadmap
                        .tools_of(skill.id)
                        .filter(|t| t.completed)
                        .map(|t| t.name.clone())
                        .collect(),
                })
            })
            .collect();

        Self {
            skills,
            roadmaps: state
                .roadmaps()
                .map(|r| (r.goal_id().clone(), r.elements()))
                .collect(),
            canvas: state.active().elements(),
            selected_goal: state.active_goal().clone(),
            folded_skills: view.folded().iter().copied().collect(),
            removed_cv_skills: state.removed_cv_skills().iter().cloned().collect(),
            completed_skill: completed_skill.map(str::to_string),
        }
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns error on malformed JSON
    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as pretty JSON
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild graph state, validating every roadmap against the dataset
    ///
    /// Roadmaps of goals the dataset no longer has are dropped silently, as
    /// are folded ids that no longer resolve.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownGoal`] if the selected goal is gone
    pub(crate) fn rebuild(&self, dataset: &Dataset) -> Result<(GraphState, IndexSet<NodeId>), EngineError> {
        let selected = dataset
            .goal(&self.selected_goal)
            .ok_or_else(|| EngineError::UnknownGoal(self.selected_goal.clone()))?;

        let mut active = Roadmap::from_elements(self.selected_goal.clone(), self.canvas.iter().cloned());
        validate_roadmap(&mut active, selected);

        let mut archive = IndexMap::new();
        for (goal_id, elements) in &self.roadmaps {
            if *goal_id == self.selected_goal {
                continue;
            }
            let Some(goal) = dataset.goal(goal_id) else {
                tracing::debug!(goal = %goal_id, "dropping roadmap of unknown goal");
                continue;
            };
            let mut roadmap = Roadmap::from_elements(goal_id.clone(), elements.iter().cloned());
            validate_roadmap(&mut roadmap, goal);
            archive.insert(goal_id.clone(), roadmap);
        }

        let mut state = GraphState::from_parts(active, archive, self.removed_cv_skills.iter().cloned().collect());
        for progress in &self.skills {
            let Some(roadmap) = state.roadmap_for_mut(&progress.goal) else {
                continue;
            };
            let Some(skill) = roadmap.skill_by_name_mut(&progress.name) else {
                continue;
            };
            skill.completed |= progress.is_completed;
            let skill_id = skill.id;
            let tools: Vec<NodeId> = roadmap
                .tools_of(skill_id)
                .filter(|t| progress.completed_tools.contains(&t.name))
                .map(|t| t.id)
                .collect();
            for id in tools {
                if let Some(tool) = roadmap.tool_mut(id) {
                    tool.completed = true;
                }
            }
        }

        let folded = self
            .folded_skills
            .iter()
            .copied()
            .filter(|id| state.roadmaps().any(|r| r.skill(*id).is_some()))
            .collect();
        Ok((state, folded))
    }
}
