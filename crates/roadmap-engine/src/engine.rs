//! Intent dispatcher
//!
//! [`RoadmapEngine`] owns the dataset, the graph state, the view state and
//! the undo history. Every intent runs against a working copy of the graph
//! state; the copy replaces the live state only when the whole intent
//! succeeded, so a refused intent leaves nothing behind.

use crate::completion;
use crate::config::EngineConfig;
use crate::error::{EngineError, Rejection};
use crate::history::History;
use crate::intent::{Intent, Outcome};
use crate::invariants;
use crate::persistence::{PersistedState, SnapshotPublisher};
use crate::reconcile::{self, Trigger};
use crate::store::{GraphState, Roadmap, Suggestion};
use crate::types::{Element, NodeId, NodeOrigin, Position};
use indexmap::{IndexMap, IndexSet};
use roadmap_dataset::{Dataset, Goal, GoalId};
use std::collections::VecDeque;
use std::sync::Arc;

/// Selection and folded tool groups
///
/// Not part of undo/redo; pruned of stale ids whenever the graph changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    selection: IndexSet<NodeId>,
    folded: IndexSet<NodeId>,
}

impl ViewState {
    /// Selected nodes
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &IndexSet<NodeId> {
        &self.selection
    }

    /// Skills whose tools are hidden
    #[inline]
    #[must_use]
    pub fn folded(&self) -> &IndexSet<NodeId> {
        &self.folded
    }

    fn prune(&mut self, state: &GraphState) {
        self.selection.retain(|id| state.active().contains_node(*id));
        self.folded
            .retain(|id| state.roadmaps().any(|r| r.skill(*id).is_some()));
    }
}

/// What one undo step restores
#[derive(Debug, Clone)]
struct Checkpoint {
    state: GraphState,
    last_completed: Option<String>,
}

/// Work queued behind the synchronous part of an intent
#[derive(Debug)]
enum FollowUp {
    Splice(Trigger),
    Suggest { from: GoalId },
}

/// The roadmap graph engine
#[derive(Debug)]
pub struct RoadmapEngine {
    dataset: Arc<Dataset>,
    config: EngineConfig,
    state: GraphState,
    view: ViewState,
    history: History<Checkpoint>,
    last_completed: Option<String>,
    publisher: Option<SnapshotPublisher>,
}

impl RoadmapEngine {
    /// Create an engine with an empty roadmap for `goal`
    ///
    /// # Errors
    /// Returns error on invalid configuration or an unknown goal
    pub fn new(dataset: Arc<Dataset>, config: EngineConfig, goal: GoalId) -> Result<Self, EngineError> {
        config.validate()?;
        if !dataset.contains_goal(&goal) {
            return Err(EngineError::UnknownGoal(goal));
        }
        tracing::info!(goal = %goal, goals = dataset.len(), "roadmap engine started");
        Ok(Self {
            history: History::new(config.history_limit),
            dataset,
            config,
            state: GraphState::new(goal),
            view: ViewState::default(),
            last_completed: None,
            publisher: None,
        })
    }

    /// Rebuild an engine from a persisted snapshot
    ///
    /// Every roadmap is validated against the dataset on the way in; the
    /// history starts empty.
    ///
    /// # Errors
    /// Returns error on invalid configuration or when the selected goal is
    /// no longer in the dataset
    pub fn restore(
        dataset: Arc<Dataset>,
        config: EngineConfig,
        persisted: &PersistedState,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let (state, folded) = persisted.rebuild(&dataset)?;
        tracing::info!(
            goal = %state.active_goal(),
            roadmaps = state.archive().len() + 1,
            "roadmap engine restored"
        );
        Ok(Self {
            history: History::new(config.history_limit),
            dataset,
            config,
            state,
            view: ViewState {
                selection: IndexSet::new(),
                folded,
            },
            last_completed: persisted.completed_skill.clone(),
            publisher: None,
        })
    }

    /// Publish a snapshot after every committed change
    #[must_use]
    pub fn with_publisher(mut self, publisher: SnapshotPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Stop publishing; returns the publisher so its task can wind down
    pub fn detach_publisher(&mut self) -> Option<SnapshotPublisher> {
        self.publisher.take()
    }

    /// Apply one intent
    ///
    /// # Errors
    /// Returns a [`Rejection`] when the intent would break an invariant or
    /// refers to something that does not exist; the engine is unchanged then
    pub fn apply(&mut self, intent: Intent) -> Result<Outcome, Rejection> {
        let kind = intent.kind();
        let result = match intent {
            Intent::Undo => Ok(self.step_history(true)),
            Intent::Redo => Ok(self.step_history(false)),
            Intent::Select { ids, additive } => Ok(self.select(ids, additive)),
            Intent::ToggleFold { skill } => self.toggle_fold(skill),
            other => self.commit(other),
        };

        match &result {
            Ok(outcome) => tracing::debug!(intent = kind, changed = outcome.changed, "intent applied"),
            Err(rejection) if rejection.is_user_visible() => {
                tracing::warn!(intent = kind, reason = %rejection, "intent rejected");
            }
            Err(rejection) => tracing::debug!(intent = kind, reason = %rejection, "intent rejected"),
        }
        result
    }

    fn commit(&mut self, intent: Intent) -> Result<Outcome, Rejection> {
        let mut working = self.state.clone();
        let mut outcome = self.dispatch(&mut working, intent)?;

        invariants::reconcile(working.active_mut());
        if working == self.state {
            return Ok(outcome);
        }

        let before = std::mem::replace(&mut self.state, working);
        self.history.push(Checkpoint {
            state: before,
            last_completed: self.last_completed.clone(),
        });
        if let Some(report) = outcome.completion.as_ref().filter(|r| r.completed_skill.is_some()) {
            self.last_completed = report.completed_skill.as_ref().map(|k| k.name.clone());
        }
        self.view.prune(&self.state);
        self.audit_active();
        self.publish();
        outcome.changed = true;
        Ok(outcome)
    }

    fn dispatch(&self, working: &mut GraphState, intent: Intent) -> Result<Outcome, Rejection> {
        let layout = &self.config.layout;
        let dataset = self.dataset.as_ref();
        let goal = active_goal(dataset, working)?;
        let mut outcome = Outcome::unchanged();
        let mut follow_ups = VecDeque::new();

        match intent {
            Intent::AddNode { name, position, parent } => {
                let created = match parent {
                    None => {
                        let created = working.active_mut().add_skill(
                            goal,
                            &name,
                            position,
                            layout.skill_size,
                            NodeOrigin::Manual,
                        )?;
                        if created.is_some() && working.forget_cv_skill(&name) {
                            tracing::debug!(skill = %name, "manual re-add clears removed CV skill");
                        }
                        created
                    }
                    Some(parent) => working
                        .active_mut()
                        .add_tool(goal, parent, &name, position, layout.tool_size)?,
                };
                outcome.created.extend(created);
            }
            Intent::AddNodes { elements } => {
                let report = working.active_mut().admit_batch(goal, &elements)?;
                outcome.created = report.admitted;
            }
            Intent::UpdateNode { id, patch } => {
                working.active_mut().update_node(id, patch)?;
            }
            Intent::RemoveNode { id } => {
                outcome.removed = remove(working, &[id])?;
            }
            Intent::DeleteSelected => {
                let ids: Vec<NodeId> = self.view.selection.iter().copied().collect();
                if !ids.is_empty() {
                    outcome.removed = remove(working, &ids)?;
                }
            }
            Intent::ToggleCompletion { id } => {
                let report = completion::toggle(working, dataset, layout, id)?;
                outcome.created.clone_from(&report.materialized);
                outcome.completion = Some(report);
            }
            Intent::MoveNodes { ids, delta } => {
                outcome.moved = working.active_mut().translate(&ids, delta)?;
            }
            Intent::MoveSelected { delta } => {
                let ids: Vec<NodeId> = self.view.selection.iter().copied().collect();
                outcome.moved = working.active_mut().translate(&ids, delta)?;
            }
            Intent::SwitchGoal { goal: target, trigger } => {
                match reconcile::switch_goal(working, dataset, &target)? {
                    Some(report) => {
                        follow_ups.extend(trigger.map(FollowUp::Splice));
                        follow_ups.push_back(FollowUp::Suggest {
                            from: report.from.clone(),
                        });
                        outcome.switch = Some(report);
                    }
                    None => follow_ups.extend(trigger.map(FollowUp::Splice)),
                }
            }
            Intent::ImportSkill { trigger } => follow_ups.push_back(FollowUp::Splice(trigger)),
            Intent::AcceptSuggestions => {
                outcome.created = reconcile::accept_suggestion(working, dataset, layout)?;
            }
            Intent::DismissSuggestions => {
                if let Some(dismissed) = working.take_suggestion() {
                    tracing::debug!(count = dismissed.skills.len(), "suggestion dismissed");
                }
            }
            Intent::AutoBuild => {
                outcome.created = completion::auto_build(working.active_mut(), goal, layout)?;
            }
            // View and history intents never reach the working copy.
            Intent::Select { .. } | Intent::ToggleFold { .. } | Intent::Undo | Intent::Redo => {}
        }

        while let Some(next) = follow_ups.pop_front() {
            match next {
                FollowUp::Splice(trigger) => {
                    let report = reconcile::splice_trigger(working, dataset, layout, &trigger)?;
                    outcome.created.extend(report.created.iter().copied());
                    outcome.splice = Some(report);
                }
                FollowUp::Suggest { from } => {
                    let suggestion = reconcile::common_completed_skills(working, dataset, &from);
                    working.set_suggestion(suggestion.clone());
                    outcome.suggestion = suggestion;
                }
            }
        }
        Ok(outcome)
    }

    fn step_history(&mut self, back: bool) -> Outcome {
        let current = Checkpoint {
            state: self.state.clone(),
            last_completed: self.last_completed.clone(),
        };
        let restored = if back {
            self.history.undo(current)
        } else {
            self.history.redo(current)
        };
        let Some(restored) = restored else {
            return Outcome::unchanged();
        };
        self.state = restored.state;
        self.last_completed = restored.last_completed;
        self.view.prune(&self.state);
        self.publish();
        Outcome {
            changed: true,
            ..Outcome::unchanged()
        }
    }

    fn select(&mut self, ids: Vec<NodeId>, additive: bool) -> Outcome {
        if !additive {
            self.view.selection.clear();
        }
        let roadmap = self.state.active();
        self.view
            .selection
            .extend(ids.into_iter().filter(|id| roadmap.contains_node(*id)));
        Outcome::unchanged()
    }

    fn toggle_fold(&mut self, skill: NodeId) -> Result<Outcome, Rejection> {
        if self.state.active().skill(skill).is_none() {
            return Err(Rejection::NodeNotFound(skill));
        }
        if !self.view.folded.shift_remove(&skill) {
            self.view.folded.insert(skill);
        }
        self.publish();
        Ok(Outcome::unchanged())
    }

    fn audit_active(&self) {
        let Some(goal) = self.dataset.goal(self.state.active_goal()) else {
            return;
        };
        let violations = invariants::audit(self.state.active(), goal);
        if violations.is_empty() {
            return;
        }
        for violation in &violations {
            tracing::error!(goal = %goal.id, %violation, "invariant violated after commit");
        }
        assert!(!crate::strict_debug(), "invariant violations after commit: {violations:?}");
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(self.snapshot());
        }
    }

    /// Active roadmap
    #[inline]
    #[must_use]
    pub fn roadmap(&self) -> &Roadmap {
        self.state.active()
    }

    /// Active goal id
    #[inline]
    #[must_use]
    pub fn active_goal(&self) -> &GoalId {
        self.state.active_goal()
    }

    /// Roadmaps of inactive goals
    #[inline]
    #[must_use]
    pub fn archive(&self) -> &IndexMap<GoalId, Roadmap> {
        self.state.archive()
    }

    /// Roadmap of any goal
    #[inline]
    #[must_use]
    pub fn roadmap_for(&self, goal: &GoalId) -> Option<&Roadmap> {
        self.state.roadmap_for(goal)
    }

    /// Full graph state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Dataset
    #[inline]
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Elements to render: the active roadmap without folded tools
    #[must_use]
    pub fn visible_elements(&self) -> Vec<Element> {
        let roadmap = self.state.active();
        let hidden: IndexSet<NodeId> = roadmap
            .tools()
            .filter(|t| self.view.folded.contains(&t.parent_skill_id))
            .map(|t| t.id)
            .collect();
        roadmap
            .elements()
            .into_iter()
            .filter(|element| match element {
                Element::Tool(t) => !hidden.contains(&t.id),
                Element::Connector(c) => !hidden.contains(&c.source_id) && !hidden.contains(&c.target_id),
                Element::Skill(_) => true,
            })
            .collect()
    }

    /// Selected nodes
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &IndexSet<NodeId> {
        self.view.selection()
    }

    /// Skills whose tools are hidden
    #[inline]
    #[must_use]
    pub fn folded(&self) -> &IndexSet<NodeId> {
        self.view.folded()
    }

    /// Pending common-skill suggestion
    #[inline]
    #[must_use]
    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.state.suggestion()
    }

    /// Whether an undo is possible
    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo is possible
    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Serializable snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> PersistedState {
        PersistedState::capture(&self.state, &self.view, self.last_completed.as_deref())
    }

    /// Place `name` after the rightmost skill; convenience for scripted use
    ///
    /// # Errors
    /// Same as [`Intent::AddNode`]
    pub fn add_skill_after_rightmost(&mut self, name: &str) -> Result<Outcome, Rejection> {
        let position = crate::store::placement::after_rightmost(self.state.active(), &self.config.layout);
        self.apply(Intent::AddNode {
            name: name.to_string(),
            position,
            parent: None,
        })
    }
}

fn active_goal<'a>(dataset: &'a Dataset, state: &GraphState) -> Result<&'a Goal, Rejection> {
    dataset
        .goal(state.active_goal())
        .ok_or_else(|| Rejection::UnknownGoal(state.active_goal().clone()))
}

fn remove(working: &mut GraphState, ids: &[NodeId]) -> Result<Vec<NodeId>, Rejection> {
    let removal = working.active_mut().remove_nodes(ids)?;
    for skill in &removal.skills {
        if skill.origin == NodeOrigin::CvImport {
            working.remember_removed_cv_skill(skill.name.clone());
        }
    }
    Ok(removal.node_ids())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionType, Offset};
    use roadmap_dataset::samples;

    fn engine() -> RoadmapEngine {
        RoadmapEngine::new(
            Arc::new(samples::frontend()),
            EngineConfig::default(),
            GoalId::from(samples::FRONTEND),
        )
        .unwrap()
    }

    fn add(engine: &mut RoadmapEngine, name: &str) -> NodeId {
        engine.add_skill_after_rightmost(name).unwrap().created[0]
    }

    #[test]
    fn adding_in_any_order_keeps_the_chain() {
        let mut engine = engine();
        let html = add(&mut engine, "HTML");
        let css = add(&mut engine, "CSS");
        let roadmap = engine.roadmap();
        let edge = roadmap.connector_between(html, css).unwrap();
        assert_eq!(edge.connection_type, ConnectionType::Normal);

        let js = add(&mut engine, "JavaScript");
        let roadmap = engine.roadmap();
        assert!(roadmap.connector_between(css, js).is_some());
        assert!(roadmap.connector_between(html, js).is_none());
        assert_eq!(roadmap.connector_count(), 2);
    }

    #[test]
    fn rejected_intent_leaves_state_alone() {
        let mut engine = engine();
        let html = add(&mut engine, "HTML");
        let before = engine.state().clone();
        let err = engine.apply(Intent::RemoveNode { id: html }).unwrap_err();
        assert_eq!(err, Rejection::LastSkill);
        assert!(err.is_user_visible());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn duplicate_add_records_no_history() {
        let mut engine = engine();
        add(&mut engine, "HTML");
        engine.apply(Intent::Undo).unwrap();
        add(&mut engine, "HTML");
        let outcome = engine.add_skill_after_rightmost("HTML").unwrap();
        assert!(!outcome.changed);
        engine.apply(Intent::Undo).unwrap();
        assert!(!engine.can_undo());
    }

    #[test]
    fn selection_moves_and_prunes() {
        let mut engine = engine();
        let html = add(&mut engine, "HTML");
        let css = add(&mut engine, "CSS");
        engine
            .apply(Intent::Select {
                ids: vec![css, NodeId::new()],
                additive: false,
            })
            .unwrap();
        assert_eq!(engine.selection().len(), 1);

        let x = engine.roadmap().skill(css).unwrap().position.x;
        engine
            .apply(Intent::MoveSelected {
                delta: Offset::new(5.0, 0.0),
            })
            .unwrap();
        assert!((engine.roadmap().skill(css).unwrap().position.x - x - 5.0).abs() < f64::EPSILON);

        engine.apply(Intent::DeleteSelected).unwrap();
        assert!(engine.selection().is_empty());
        assert!(engine.roadmap().skill(html).is_some());
    }

    #[test]
    fn folded_tools_are_hidden() {
        let mut engine = engine();
        let html = add(&mut engine, "HTML");
        engine
            .apply(Intent::AddNode {
                name: "VS Code".into(),
                position: Position::default(),
                parent: Some(html),
            })
            .unwrap();
        assert_eq!(engine.visible_elements().len(), 3);

        engine.apply(Intent::ToggleFold { skill: html }).unwrap();
        assert_eq!(engine.visible_elements().len(), 1);
        assert!(!engine.can_redo());
        engine.apply(Intent::ToggleFold { skill: html }).unwrap();
        assert_eq!(engine.visible_elements().len(), 3);
    }
}
