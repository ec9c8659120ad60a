//! Invariant Maintainer
//!
//! Pure rules deciding which prerequisite connectors must exist for a set of
//! skill levels, plus the pass that rewires a roadmap to match them.
//!
//! Every skill points to all skills on the nearest level above its own. When
//! several skills share that level each gets its own inbound edge; edges never
//! go backward or sideways. Tool ownership connectors are never touched here.
//!
//! Because fan-out reaches every node on the next level, connecting
//! consecutive levels bipartite-style (the auto-build path) yields exactly
//! the same edge set.

use crate::store::Roadmap;
use crate::types::{ConnectionType, ConnectorId, ConnectorKind, NodeId};
use petgraph::algo::is_cyclic_directed;
use roadmap_dataset::Goal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};

/// A prerequisite edge the level rule demands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequiredEdge {
    /// Lower-level skill
    pub source: NodeId,
    /// Skill on the nearest higher level
    pub target: NodeId,
    /// `Warning` when the levels are not adjacent
    pub connection_type: ConnectionType,
}

/// Compute required prerequisite edges from `(node, level)` pairs
///
/// Output order follows ascending source level, then input order.
#[must_use]
pub fn required_skill_edges(levels: impl IntoIterator<Item = (NodeId, u32)>) -> Vec<RequiredEdge> {
    let mut by_level: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
    for (id, level) in levels {
        by_level.entry(level).or_default().push(id);
    }

    let mut edges = Vec::new();
    for (level, sources) in &by_level {
        let Some((next_level, targets)) = by_level.range((Excluded(*level), Unbounded)).next() else {
            continue;
        };
        let connection_type = ConnectionType::for_gap(next_level - level);
        for source in sources {
            for target in targets {
                edges.push(RequiredEdge {
                    source: *source,
                    target: *target,
                    connection_type,
                });
            }
        }
    }
    edges
}

/// Edits that bring a roadmap's prerequisite edges in line with the rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Missing edges
    pub add: Vec<RequiredEdge>,
    /// Forked, skipping, backward or dangling connectors
    pub remove: Vec<ConnectorId>,
    /// Required edges carrying the wrong marker
    pub retype: Vec<(ConnectorId, ConnectionType)>,
}

impl ReconcilePlan {
    /// Whether the roadmap already complies
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.retype.is_empty()
    }
}

/// Counts of a reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Edges added
    pub added: usize,
    /// Connectors removed
    pub removed: usize,
    /// Markers changed
    pub retyped: usize,
}

impl ReconcileReport {
    /// Whether nothing changed
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.retyped == 0
    }
}

/// Compute the reconcile plan for a roadmap
///
/// Connectors classified as skill-to-tool are left alone. Everything else
/// that is not required, including connectors with dangling endpoints or a
/// tool as source, is scheduled for removal.
#[must_use]
pub fn plan(roadmap: &Roadmap) -> ReconcilePlan {
    let required = required_skill_edges(roadmap.skills().map(|s| (s.id, s.level)));
    let wanted: HashMap<(NodeId, NodeId), ConnectionType> = required
        .iter()
        .map(|e| ((e.source, e.target), e.connection_type))
        .collect();

    let mut result = ReconcilePlan::default();
    let mut present: HashSet<(NodeId, NodeId)> = HashSet::new();

    for connector in roadmap.connectors() {
        if roadmap.connector_kind(connector) == ConnectorKind::SkillToTool {
            continue;
        }
        let pair = connector.endpoints();
        match wanted.get(&pair) {
            Some(kind) if present.insert(pair) => {
                if connector.connection_type != *kind {
                    result.retype.push((connector.id, *kind));
                }
            }
            _ => result.remove.push(connector.id),
        }
    }

    result.add = required
        .into_iter()
        .filter(|e| !present.contains(&(e.source, e.target)))
        .collect();
    result
}

/// Rewire a roadmap's prerequisite edges; idempotent
pub fn reconcile(roadmap: &mut Roadmap) -> ReconcileReport {
    let plan = plan(roadmap);
    if plan.is_empty() {
        return ReconcileReport::default();
    }

    for id in &plan.remove {
        roadmap.remove_connector(*id);
    }
    for (id, kind) in &plan.retype {
        roadmap.set_connection_type(*id, *kind);
    }
    for edge in &plan.add {
        roadmap.connect(edge.source, edge.target, edge.connection_type);
    }

    let report = ReconcileReport {
        added: plan.add.len(),
        removed: plan.remove.len(),
        retyped: plan.retype.len(),
    };
    tracing::trace!(
        goal = %roadmap.goal_id(),
        added = report.added,
        removed = report.removed,
        retyped = report.retyped,
        "prerequisite edges reconciled"
    );
    report
}

/// A broken structural rule found by [`audit`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Skill name missing from the goal
    #[error("skill {name:?} ({node}) is not part of the goal")]
    UnknownSkill {
        /// Node
        node: NodeId,
        /// Name
        name: String,
    },
    /// Skill belongs to a different goal than its roadmap
    #[error("skill {node} carries a foreign goal id")]
    ForeignSkill {
        /// Node
        node: NodeId,
    },
    /// Stored level differs from the dataset
    #[error("skill {node} has level {stored}, dataset says {expected}")]
    LevelMismatch {
        /// Node
        node: NodeId,
        /// Level on the node
        stored: u32,
        /// Level in the dataset
        expected: u32,
    },
    /// Same skill name twice
    #[error("skill {0:?} appears more than once")]
    DuplicateSkill(String),
    /// Tool whose parent is not on the roadmap
    #[error("tool {0} has no parent skill")]
    OrphanTool(NodeId),
    /// Tool not listed under its parent
    #[error("tool {name:?} ({node}) is not listed under its parent")]
    UnknownTool {
        /// Node
        node: NodeId,
        /// Name
        name: String,
    },
    /// Same tool twice under one parent
    #[error("tool {name:?} appears more than once under {parent}")]
    DuplicateTool {
        /// Parent skill
        parent: NodeId,
        /// Name
        name: String,
    },
    /// Tool without exactly one ownership connector
    #[error("tool {tool} has {count} ownership connectors")]
    ToolConnectorCount {
        /// Tool
        tool: NodeId,
        /// Connectors found
        count: usize,
    },
    /// Skill-to-tool connector from a skill that does not own the tool
    #[error("connector {0} links a tool to a skill that does not own it")]
    ForeignToolConnector(ConnectorId),
    /// Connector endpoints do not resolve or start at a tool
    #[error("connector {0} is dangling or starts at a tool")]
    InvalidConnector(ConnectorId),
    /// Two connectors with the same endpoints
    #[error("connector {0} duplicates another connector's endpoints")]
    DuplicateConnector(ConnectorId),
    /// Prerequisite edge that goes backward or sideways
    #[error("connector {0} does not point to a higher level")]
    BackwardEdge(ConnectorId),
    /// Prerequisite edge the level rule does not call for
    #[error("connector {0} skips or forks the level chain")]
    UnexpectedEdge(ConnectorId),
    /// Required prerequisite edge absent
    #[error("missing connector {source_node} -> {target_node}")]
    MissingEdge {
        /// Lower-level skill
        source_node: NodeId,
        /// Nearest higher skill
        target_node: NodeId,
    },
    /// Level-gap marker does not match the levels
    #[error("connector {0} carries the wrong level-gap marker")]
    WrongMarker(ConnectorId),
    /// Prerequisite graph has a cycle
    #[error("prerequisite graph contains a cycle")]
    Cycle,
}

/// Check every structural invariant of a roadmap against its goal
#[must_use]
pub fn audit(roadmap: &Roadmap, goal: &Goal) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut names = HashSet::new();
    for skill in roadmap.skills() {
        if skill.goal_id != *roadmap.goal_id() {
            violations.push(InvariantViolation::ForeignSkill { node: skill.id });
        }
        match goal.level_of(&skill.name) {
            None => violations.push(InvariantViolation::UnknownSkill {
                node: skill.id,
                name: skill.name.clone(),
            }),
            Some(expected) if expected != skill.level => {
                violations.push(InvariantViolation::LevelMismatch {
                    node: skill.id,
                    stored: skill.level,
                    expected,
                });
            }
            Some(_) => {}
        }
        if !names.insert(skill.name.as_str()) {
            violations.push(InvariantViolation::DuplicateSkill(skill.name.clone()));
        }
    }

    let mut tool_names = HashSet::new();
    for tool in roadmap.tools() {
        let Some(parent) = roadmap.skill(tool.parent_skill_id) else {
            violations.push(InvariantViolation::OrphanTool(tool.id));
            continue;
        };
        if !goal.lists_tool(&parent.name, &tool.name) {
            violations.push(InvariantViolation::UnknownTool {
                node: tool.id,
                name: tool.name.clone(),
            });
        }
        if !tool_names.insert((tool.parent_skill_id, tool.name.as_str())) {
            violations.push(InvariantViolation::DuplicateTool {
                parent: tool.parent_skill_id,
                name: tool.name.clone(),
            });
        }
        let count = roadmap
            .connectors()
            .filter(|c| c.target_id == tool.id && c.source_id == tool.parent_skill_id)
            .count();
        if count != 1 {
            violations.push(InvariantViolation::ToolConnectorCount { tool: tool.id, count });
        }
    }

    let required: HashMap<(NodeId, NodeId), ConnectionType> =
        required_skill_edges(roadmap.skills().map(|s| (s.id, s.level)))
            .into_iter()
            .map(|e| ((e.source, e.target), e.connection_type))
            .collect();
    let mut pairs = HashSet::new();

    for connector in roadmap.connectors() {
        if !pairs.insert(connector.endpoints()) {
            violations.push(InvariantViolation::DuplicateConnector(connector.id));
            continue;
        }
        match roadmap.connector_kind(connector) {
            ConnectorKind::Invalid => violations.push(InvariantViolation::InvalidConnector(connector.id)),
            ConnectorKind::SkillToTool => {
                let owned = roadmap
                    .tool(connector.target_id)
                    .is_some_and(|t| t.parent_skill_id == connector.source_id);
                if !owned {
                    violations.push(InvariantViolation::ForeignToolConnector(connector.id));
                }
            }
            ConnectorKind::SkillToSkill => {
                let level = |id| roadmap.skill(id).map_or(0, |s| s.level);
                if level(connector.source_id) >= level(connector.target_id) {
                    violations.push(InvariantViolation::BackwardEdge(connector.id));
                    continue;
                }
                match required.get(&connector.endpoints()) {
                    None => violations.push(InvariantViolation::UnexpectedEdge(connector.id)),
                    Some(kind) if *kind != connector.connection_type => {
                        violations.push(InvariantViolation::WrongMarker(connector.id));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    for (source, target) in required.keys() {
        if !pairs.contains(&(*source, *target)) {
            violations.push(InvariantViolation::MissingEdge {
                source_node: *source,
                target_node: *target,
            });
        }
    }

    if is_cyclic_directed(&roadmap.skill_graph()) {
        violations.push(InvariantViolation::Cycle);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Connector, Position, Size, SkillNode, ToolNode};
    use roadmap_dataset::{samples, GoalId};

    fn add(roadmap: &mut Roadmap, name: &str, level: u32) -> NodeId {
        roadmap.insert_skill(SkillNode::new(
            roadmap.goal_id().clone(),
            name,
            level,
            Position::default(),
            Size::new(10.0, 10.0),
        ))
    }

    fn frontend() -> Roadmap {
        Roadmap::new(GoalId::from(samples::FRONTEND))
    }

    #[test]
    fn nearest_level_only() {
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();
        let edges = required_skill_edges([(a, 1), (b, 2), (c, 3)]);
        let pairs: Vec<_> = edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs, vec![(a, b), (b, c)]);
        assert!(edges.iter().all(|e| e.connection_type == ConnectionType::Normal));
    }

    #[test]
    fn gap_is_marked_and_ties_fan_out() {
        let a = NodeId::new();
        let b = NodeId::new();
        let c = NodeId::new();
        let edges = required_skill_edges([(a, 1), (b, 3), (c, 3)]);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.source == a));
        assert!(edges.iter().all(|e| e.connection_type == ConnectionType::Warning));
    }

    #[test]
    fn same_level_gets_no_edge() {
        let edges = required_skill_edges([(NodeId::new(), 2), (NodeId::new(), 2)]);
        assert!(edges.is_empty());
    }

    #[test]
    fn reconcile_drops_skip_edge() {
        let mut roadmap = frontend();
        let html = add(&mut roadmap, "HTML", 1);
        let js = add(&mut roadmap, "JavaScript", 3);
        reconcile(&mut roadmap);
        let skip = roadmap.connector_between(html, js).unwrap();
        assert_eq!(skip.connection_type, ConnectionType::Warning);

        let css = add(&mut roadmap, "CSS", 2);
        let report = reconcile(&mut roadmap);
        assert_eq!(report.added, 2);
        assert_eq!(report.removed, 1);
        assert!(roadmap.connector_between(html, js).is_none());
        assert!(roadmap.connector_between(html, css).is_some());
        assert!(roadmap.connector_between(css, js).is_some());
        assert!(audit(&roadmap, &samples::frontend_goal()).is_empty());
    }

    #[test]
    fn reconcile_is_idempotent_and_keeps_tools() {
        let mut roadmap = frontend();
        let html = add(&mut roadmap, "HTML", 1);
        add(&mut roadmap, "CSS", 2);
        let tool = roadmap.attach_tool(ToolNode::new("VS Code", html, Position::default(), Size::new(1.0, 1.0)));
        let owner = roadmap.connector_between(html, tool).unwrap().id;

        assert!(!reconcile(&mut roadmap).is_noop());
        let snapshot = roadmap.clone();
        assert!(reconcile(&mut roadmap).is_noop());
        assert_eq!(roadmap, snapshot);
        assert!(roadmap.connector(owner).is_some());
    }

    #[test]
    fn reconcile_removes_tool_sourced_and_dangling() {
        let mut roadmap = frontend();
        let html = add(&mut roadmap, "HTML", 1);
        let css = add(&mut roadmap, "CSS", 2);
        let tool = roadmap.attach_tool(ToolNode::new("VS Code", html, Position::default(), Size::new(1.0, 1.0)));
        roadmap.insert_connector(Connector::new(tool, css, ConnectionType::Normal));
        roadmap.insert_connector(Connector::new(css, NodeId::new(), ConnectionType::Normal));

        let report = reconcile(&mut roadmap);
        assert_eq!(report.removed, 2);
        assert!(audit(&roadmap, &samples::frontend_goal()).is_empty());
    }

    #[test]
    fn audit_flags_backward_edges() {
        let mut roadmap = frontend();
        let html = add(&mut roadmap, "HTML", 1);
        let css = add(&mut roadmap, "CSS", 2);
        roadmap.insert_connector(Connector::new(css, html, ConnectionType::Normal));

        let violations = audit(&roadmap, &samples::frontend_goal());
        assert!(violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::BackwardEdge(_))));
        assert!(violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::MissingEdge { .. })));
    }

    #[test]
    fn audit_flags_unknown_names() {
        let mut roadmap = frontend();
        add(&mut roadmap, "COBOL", 1);
        let violations = audit(&roadmap, &samples::frontend_goal());
        assert!(matches!(violations[0], InvariantViolation::UnknownSkill { .. }));
    }
}
