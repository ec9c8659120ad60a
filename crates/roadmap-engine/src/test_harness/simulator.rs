//! Roadmap Simulator - randomized intent driver for the engine
//!
//! Feeds a seeded stream of intents, valid and invalid, into a
//! [`RoadmapEngine`] and checks after every step that:
//! - Every roadmap still passes [`invariants::audit`]
//! - A rejected intent left the graph state untouched
//! - Undo followed by redo lands on the same states
//! - A completed skill is completed on every roadmap that carries its name

use crate::config::EngineConfig;
use crate::engine::RoadmapEngine;
use crate::intent::Intent;
use crate::invariants::{self, InvariantViolation};
use crate::reconcile::Trigger;
use crate::store::GraphState;
use crate::types::{NodeId, NodePatch, Offset, Position, Size};
use indexmap::IndexMap;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use roadmap_dataset::{Dataset, GoalId};
use std::fmt::Write as _;
use std::sync::Arc;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Intents to generate
    pub total_operations: u64,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Undo and redo every committed change and compare states
    pub check_undo_round_trip: bool,
    /// Probability of generating a name or id the engine must refuse
    pub invalid_ratio: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1_000,
            stop_on_first_violation: false,
            check_undo_round_trip: true,
            invalid_ratio: 0.15,
        }
    }
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// The engine could not be created
    Setup {
        /// Construction error
        error: String,
    },
    /// A roadmap failed its audit
    InvariantBroken {
        /// Step index
        step: u64,
        /// Intent kind
        intent: &'static str,
        /// Goal of the broken roadmap
        goal: GoalId,
        /// What failed
        violation: InvariantViolation,
    },
    /// A refused intent changed the graph anyway
    RejectionMutatedState {
        /// Step index
        step: u64,
        /// Intent kind
        intent: &'static str,
    },
    /// Undo did not restore the state before the intent
    UndoMismatch {
        /// Step index
        step: u64,
        /// Intent kind
        intent: &'static str,
    },
    /// Redo did not restore the state after the intent
    RedoMismatch {
        /// Step index
        step: u64,
        /// Intent kind
        intent: &'static str,
    },
    /// A skill completed on one roadmap stayed open on another
    PropagationMissing {
        /// Step index
        step: u64,
        /// Skill name
        skill: String,
        /// Goal whose roadmap kept it open
        goal: GoalId,
    },
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    /// Intents applied
    pub total_operations: u64,
    /// Intents that changed the graph
    pub committed: u64,
    /// Intents accepted without a graph change
    pub unchanged: u64,
    /// Intents the engine refused
    pub rejected: u64,
    /// Count per intent kind
    pub operations_by_type: IndexMap<&'static str, u64>,
}

impl SimulatorStats {
    fn record(&mut self, kind: &'static str) {
        self.total_operations += 1;
        *self.operations_by_type.entry(kind).or_insert(0) += 1;
    }
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    /// Counters
    pub stats: SimulatorStats,
    /// Everything that went wrong
    pub violations: Vec<Violation>,
    /// Roadmaps held at the end
    pub final_roadmap_count: usize,
    /// Nodes on all roadmaps at the end
    pub final_node_count: usize,
}

impl SimulatorReport {
    /// Whether no violation was recorded
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Roadmap Simulator Report ===\n\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Total Operations: {}", self.stats.total_operations);
        let _ = writeln!(report, "Committed: {}", self.stats.committed);
        let _ = writeln!(report, "Unchanged: {}", self.stats.unchanged);
        let _ = writeln!(report, "Rejected: {}", self.stats.rejected);
        let _ = writeln!(report, "Violations: {}", self.violations.len());
        let _ = writeln!(report, "Final Roadmaps: {}", self.final_roadmap_count);
        let _ = writeln!(report, "Final Nodes: {}", self.final_node_count);

        if !self.stats.operations_by_type.is_empty() {
            report.push_str("\n=== Operations ===\n");
            for (kind, count) in &self.stats.operations_by_type {
                let _ = writeln!(report, "{kind}: {count}");
            }
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator against `dataset`
///
/// The engine starts on the first goal of the dataset.
#[must_use]
pub fn run_simulator(config: SimulatorConfig, dataset: Arc<Dataset>) -> SimulatorReport {
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    let Some(first) = dataset.goals().next().map(|g| g.id.clone()) else {
        violations.push(Violation::Setup {
            error: "dataset has no goals".into(),
        });
        return finish(config, stats, violations, None);
    };
    let mut engine = match RoadmapEngine::new(Arc::clone(&dataset), EngineConfig::default(), first) {
        Ok(engine) => engine,
        Err(e) => {
            violations.push(Violation::Setup { error: e.to_string() });
            return finish(config, stats, violations, None);
        }
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    tracing::info!(seed = config.seed, operations = config.total_operations, "simulation started");

    for step in 0..config.total_operations {
        let intent = generate_intent(&mut rng, &engine, &dataset, config.invalid_ratio);
        let kind = intent.kind();
        let is_history = matches!(intent, Intent::Undo | Intent::Redo);
        let before = engine.state().clone();
        stats.record(kind);

        match engine.apply(intent) {
            Err(_) => {
                stats.rejected += 1;
                if engine.state() != &before {
                    violations.push(Violation::RejectionMutatedState { step, intent: kind });
                }
            }
            Ok(outcome) if !outcome.changed => stats.unchanged += 1,
            Ok(outcome) => {
                stats.committed += 1;
                if config.check_undo_round_trip && !is_history {
                    check_round_trip(&mut engine, &before, step, kind, &mut violations);
                }
                if let Some(key) = outcome.completion.and_then(|r| r.completed_skill) {
                    check_propagation(engine.state(), &key.name, step, &mut violations);
                }
            }
        }

        audit_all(&engine, step, kind, &mut violations);

        if config.stop_on_first_violation && !violations.is_empty() {
            tracing::warn!(step, "simulation stopped on first violation");
            break;
        }
    }

    finish(config, stats, violations, Some(&engine))
}

fn finish(
    config: SimulatorConfig,
    stats: SimulatorStats,
    violations: Vec<Violation>,
    engine: Option<&RoadmapEngine>,
) -> SimulatorReport {
    let (final_roadmap_count, final_node_count) = engine.map_or((0, 0), |engine| {
        let state = engine.state();
        (
            state.roadmaps().count(),
            state.roadmaps().map(|r| r.skill_count() + r.tool_count()).sum(),
        )
    });
    SimulatorReport {
        config,
        stats,
        violations,
        final_roadmap_count,
        final_node_count,
    }
}

fn check_round_trip(
    engine: &mut RoadmapEngine,
    before: &GraphState,
    step: u64,
    intent: &'static str,
    violations: &mut Vec<Violation>,
) {
    let after = engine.state().clone();
    if engine.apply(Intent::Undo).is_err() || engine.state() != before {
        violations.push(Violation::UndoMismatch { step, intent });
    }
    if engine.apply(Intent::Redo).is_err() || engine.state() != &after {
        violations.push(Violation::RedoMismatch { step, intent });
    }
}

fn check_propagation(state: &GraphState, name: &str, step: u64, violations: &mut Vec<Violation>) {
    for roadmap in state.roadmaps() {
        if roadmap.skill_by_name(name).is_some_and(|s| !s.completed) {
            violations.push(Violation::PropagationMissing {
                step,
                skill: name.to_string(),
                goal: roadmap.goal_id().clone(),
            });
        }
    }
}

fn audit_all(engine: &RoadmapEngine, step: u64, intent: &'static str, violations: &mut Vec<Violation>) {
    for roadmap in engine.state().roadmaps() {
        let Some(goal) = engine.dataset().goal(roadmap.goal_id()) else {
            continue;
        };
        for violation in invariants::audit(roadmap, goal) {
            violations.push(Violation::InvariantBroken {
                step,
                intent,
                goal: goal.id.clone(),
                violation,
            });
        }
    }
}

const BOGUS_NAMES: [&str; 3] = ["COBOL", "Punch Cards", ""];

fn generate_intent(rng: &mut StdRng, engine: &RoadmapEngine, dataset: &Dataset, invalid_ratio: f64) -> Intent {
    let invalid = rng.gen_bool(invalid_ratio.clamp(0.0, 1.0));
    let roadmap = engine.roadmap();
    let skills: Vec<NodeId> = roadmap.skills().map(|s| s.id).collect();
    let mut nodes: Vec<NodeId> = skills.clone();
    nodes.extend(roadmap.tools().map(|t| t.id));
    if invalid || nodes.is_empty() {
        nodes.push(NodeId::new());
    }

    let goal = dataset.goal(engine.active_goal());
    let skill_names: Vec<&str> = goal
        .map(|g| g.skills.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let all_names: Vec<&str> = dataset
        .goals()
        .flat_map(|g| {
            g.skills
                .iter()
                .flat_map(|(name, spec)| std::iter::once(name.as_str()).chain(spec.tools.iter().map(String::as_str)))
        })
        .collect();

    let pick_name = |rng: &mut StdRng, pool: &[&str]| -> String {
        let pool = if invalid || pool.is_empty() { &BOGUS_NAMES[..] } else { pool };
        pool.choose(rng).copied().unwrap_or_default().to_string()
    };
    let pick_node = |rng: &mut StdRng| nodes.choose(rng).copied().unwrap_or_else(NodeId::new);
    let position = Position::new(rng.gen_range(0.0..2_000.0), rng.gen_range(0.0..1_000.0));
    let delta = Offset::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));

    match rng.gen_range(0..20) {
        0..=4 => Intent::AddNode {
            name: pick_name(rng, &skill_names),
            position,
            parent: None,
        },
        5 | 6 => {
            let parent = skills.choose(rng).copied().unwrap_or_else(NodeId::new);
            let tools: Vec<&str> = roadmap
                .skill(parent)
                .and_then(|s| goal.and_then(|g| g.skill(&s.name)))
                .map(|spec| spec.tools.iter().map(String::as_str).collect())
                .unwrap_or_default();
            Intent::AddNode {
                name: pick_name(rng, &tools),
                position,
                parent: Some(parent),
            }
        }
        7 | 8 => Intent::ToggleCompletion { id: pick_node(rng) },
        9 => Intent::RemoveNode { id: pick_node(rng) },
        10 => Intent::MoveNodes {
            ids: vec![pick_node(rng)],
            delta,
        },
        11 => Intent::UpdateNode {
            id: pick_node(rng),
            patch: NodePatch {
                position: Some(position),
                size: rng.gen_bool(0.3).then_some(Size::new(200.0, 60.0)),
            },
        },
        12 => Intent::Select {
            ids: vec![pick_node(rng)],
            additive: rng.gen_bool(0.5),
        },
        13 => {
            if rng.gen_bool(0.5) {
                Intent::MoveSelected { delta }
            } else {
                Intent::DeleteSelected
            }
        }
        14 => {
            let target = if invalid {
                GoalId::from("no-such-goal")
            } else {
                dataset
                    .goals()
                    .map(|g| g.id.clone())
                    .collect::<Vec<_>>()
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| engine.active_goal().clone())
            };
            let name = pick_name(rng, &all_names);
            let trigger = rng.gen_bool(0.5).then(|| random_trigger(rng, name));
            Intent::SwitchGoal { goal: target, trigger }
        }
        15 => {
            let name = pick_name(rng, &all_names);
            Intent::ImportSkill {
                trigger: random_trigger(rng, name),
            }
        }
        16 => match rng.gen_range(0..3) {
            0 => Intent::AcceptSuggestions,
            1 => Intent::DismissSuggestions,
            _ => Intent::AutoBuild,
        },
        17 => Intent::ToggleFold {
            skill: skills.choose(rng).copied().unwrap_or_else(NodeId::new),
        },
        18 => Intent::Undo,
        _ => Intent::Redo,
    }
}

fn random_trigger(rng: &mut StdRng, name: String) -> Trigger {
    if rng.gen_bool(0.5) {
        Trigger::cross_goal(name)
    } else {
        Trigger::cv_import(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_dataset::samples;

    #[test]
    fn short_run_on_career_tracks_passes() {
        let config = SimulatorConfig {
            total_operations: 300,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(config, Arc::new(samples::career_tracks()));
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.total_operations, 300);
        assert!(report.stats.committed > 0);
        assert!(report.stats.rejected > 0);
    }

    #[test]
    fn same_seed_same_stats() {
        let dataset = Arc::new(samples::career_tracks());
        let config = SimulatorConfig {
            seed: 7,
            total_operations: 150,
            ..SimulatorConfig::default()
        };
        let a = run_simulator(config.clone(), Arc::clone(&dataset));
        let b = run_simulator(config, dataset);
        assert_eq!(a.stats.committed, b.stats.committed);
        assert_eq!(a.stats.rejected, b.stats.rejected);
        assert_eq!(a.final_node_count, b.final_node_count);
    }

    #[test]
    fn empty_dataset_is_a_setup_failure() {
        let report = run_simulator(SimulatorConfig::default(), Arc::new(Dataset::default()));
        assert!(!report.passed());
        assert!(matches!(report.violations[0], Violation::Setup { .. }));
        assert!(report.generate_text().contains("FAIL"));
    }
}
