//! Node/Edge Store
//!
//! [`Roadmap`] holds the elements of one goal; [`GraphState`] holds the
//! active roadmap, the archive of every other goal the user touched, and the
//! bits of cross-goal bookkeeping that undo/redo must restore with them.

mod ops;
pub mod placement;
mod roadmap;

pub use ops::{BatchReport, Removal};
pub use roadmap::Roadmap;

use indexmap::{IndexMap, IndexSet};
use roadmap_dataset::{GoalId, SkillKey};
use serde::{Deserialize, Serialize};

/// Pending offer to carry completed skills into the goal just switched to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Goal the skills were completed in
    pub from: GoalId,
    /// Goal that lacks them
    pub to: GoalId,
    /// Skill names, in the outgoing roadmap's order
    pub skills: Vec<String>,
}

/// Everything undo/redo restores
#[derive(Debug, Clone, PartialEq)]
pub struct GraphState {
    active: Roadmap,
    archive: IndexMap<GoalId, Roadmap>,
    removed_cv_skills: IndexSet<String>,
    suggestion: Option<Suggestion>,
}

impl GraphState {
    /// Start with an empty roadmap for `goal`
    #[must_use]
    pub fn new(goal: GoalId) -> Self {
        Self {
            active: Roadmap::new(goal),
            archive: IndexMap::new(),
            removed_cv_skills: IndexSet::new(),
            suggestion: None,
        }
    }

    pub(crate) fn from_parts(
        active: Roadmap,
        archive: IndexMap<GoalId, Roadmap>,
        removed_cv_skills: IndexSet<String>,
    ) -> Self {
        Self {
            active,
            archive,
            removed_cv_skills,
            suggestion: None,
        }
    }

    /// Roadmap currently mutated by intents
    #[inline]
    #[must_use]
    pub fn active(&self) -> &Roadmap {
        &self.active
    }

    /// Active goal id
    #[inline]
    #[must_use]
    pub fn active_goal(&self) -> &GoalId {
        self.active.goal_id()
    }

    /// Roadmaps of inactive goals
    #[inline]
    #[must_use]
    pub fn archive(&self) -> &IndexMap<GoalId, Roadmap> {
        &self.archive
    }

    /// Roadmap of any goal, active or archived
    #[must_use]
    pub fn roadmap_for(&self, goal: &GoalId) -> Option<&Roadmap> {
        if self.active.goal_id() == goal {
            Some(&self.active)
        } else {
            self.archive.get(goal)
        }
    }

    /// Every roadmap, active first
    pub fn roadmaps(&self) -> impl Iterator<Item = &Roadmap> {
        std::iter::once(&self.active).chain(self.archive.values())
    }

    /// CV skill names the user deleted; later CV imports of them are ignored
    #[inline]
    #[must_use]
    pub fn removed_cv_skills(&self) -> &IndexSet<String> {
        &self.removed_cv_skills
    }

    /// Pending common-skill suggestion
    #[inline]
    #[must_use]
    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    /// Keys of every completed skill across all roadmaps
    #[must_use]
    pub fn completed_skill_keys(&self) -> Vec<SkillKey> {
        self.roadmaps()
            .flat_map(|r| {
                r.completed_skill_names()
                    .map(|name| SkillKey::new(r.goal_id().clone(), name))
            })
            .collect()
    }

    pub(crate) fn active_mut(&mut self) -> &mut Roadmap {
        &mut self.active
    }

    pub(crate) fn roadmap_for_mut(&mut self, goal: &GoalId) -> Option<&mut Roadmap> {
        if self.active.goal_id() == goal {
            Some(&mut self.active)
        } else {
            self.archive.get_mut(goal)
        }
    }

    pub(crate) fn archive_mut(&mut self) -> &mut IndexMap<GoalId, Roadmap> {
        &mut self.archive
    }

    /// Make `incoming` active and archive the outgoing roadmap
    pub(crate) fn swap_active(&mut self, incoming: Roadmap) {
        let outgoing = std::mem::replace(&mut self.active, incoming);
        self.archive.shift_remove(self.active.goal_id());
        self.archive.insert(outgoing.goal_id().clone(), outgoing);
    }

    pub(crate) fn take_archived(&mut self, goal: &GoalId) -> Option<Roadmap> {
        self.archive.shift_remove(goal)
    }

    pub(crate) fn forget_cv_skill(&mut self, name: &str) -> bool {
        self.removed_cv_skills.shift_remove(name)
    }

    pub(crate) fn remember_removed_cv_skill(&mut self, name: String) {
        self.removed_cv_skills.insert(name);
    }

    pub(crate) fn set_suggestion(&mut self, suggestion: Option<Suggestion>) {
        self.suggestion = suggestion;
    }

    pub(crate) fn take_suggestion(&mut self) -> Option<Suggestion> {
        self.suggestion.take()
    }
}
