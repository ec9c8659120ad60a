//! Admission and removal rules of the node/edge store
//!
//! Every operation here is all-or-nothing: it either validates the whole
//! request and then mutates, or returns a [`Rejection`] before touching
//! anything. Prerequisite edges are not maintained here; the invariant pass
//! runs after every structural change.

use super::placement;
use super::roadmap::Roadmap;
use crate::config::LayoutConfig;
use crate::error::Rejection;
use crate::types::{
    ConnectionType, Connector, ConnectorId, Element, NodeId, NodeOrigin, NodePatch, Offset,
    Position, SkillNode, Size, ToolNode,
};
use indexmap::{IndexMap, IndexSet};
use roadmap_dataset::Goal;
use std::collections::{HashMap, HashSet};

/// Result of an atomic batch admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Nodes actually inserted
    pub admitted: Vec<NodeId>,
    /// Connectors actually inserted
    pub connectors: Vec<ConnectorId>,
    /// Elements dropped as duplicates (by id, by name or by endpoint pair)
    pub skipped: usize,
}

/// Result of a cascading delete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Removal {
    /// Removed skills, cascade included
    pub skills: Vec<SkillNode>,
    /// Removed tools
    pub tools: Vec<ToolNode>,
    /// Number of removed connectors
    pub connectors: usize,
}

impl Removal {
    /// Ids of every removed node
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.skills
            .iter()
            .map(|s| s.id)
            .chain(self.tools.iter().map(|t| t.id))
            .collect()
    }
}

enum Endpoint {
    Skill(u32),
    Tool(NodeId),
}

impl Roadmap {
    /// Add a skill by dataset name
    ///
    /// Adding a name that is already on the roadmap is a silent no-op and
    /// returns `Ok(None)`.
    ///
    /// # Errors
    /// Returns [`Rejection::UnknownSkill`] if the goal has no such skill
    pub fn add_skill(
        &mut self,
        goal: &Goal,
        name: &str,
        position: Position,
        size: Size,
        origin: NodeOrigin,
    ) -> Result<Option<NodeId>, Rejection> {
        check_geometry(Some(position), Some(size))?;
        let level = goal.level_of(name).ok_or_else(|| Rejection::UnknownSkill {
            goal: goal.id.clone(),
            name: name.to_string(),
        })?;
        if self.skill_by_name(name).is_some() {
            tracing::trace!(skill = name, "skill already on roadmap");
            return Ok(None);
        }
        let node = SkillNode::new(self.goal_id().clone(), name, level, position, size).with_origin(origin);
        Ok(Some(self.insert_skill(node)))
    }

    /// Add a tool under an existing skill
    ///
    /// # Errors
    /// Returns error if the parent is missing or the dataset does not list
    /// the tool under it
    pub fn add_tool(
        &mut self,
        goal: &Goal,
        parent: NodeId,
        name: &str,
        position: Position,
        size: Size,
    ) -> Result<Option<NodeId>, Rejection> {
        check_geometry(Some(position), Some(size))?;
        let parent_name = self
            .skill(parent)
            .map(|s| s.name.clone())
            .ok_or(Rejection::NodeNotFound(parent))?;
        if !goal.lists_tool(&parent_name, name) {
            return Err(Rejection::UnknownTool {
                skill: parent_name,
                tool: name.to_string(),
            });
        }
        if self.tool_by_name(parent, name).is_some() {
            return Ok(None);
        }
        Ok(Some(self.attach_tool(ToolNode::new(name, parent, position, size))))
    }

    /// Add a skill plus every tool the dataset lists for it
    ///
    /// Returns `None` when the skill was already present.
    pub(crate) fn materialize_skill(
        &mut self,
        goal: &Goal,
        name: &str,
        position: Position,
        origin: NodeOrigin,
        layout: &LayoutConfig,
    ) -> Result<Option<NodeId>, Rejection> {
        let Some(id) = self.add_skill(goal, name, position, layout.skill_size, origin)? else {
            return Ok(None);
        };
        let tools = goal.skill(name).map(|s| s.tools.clone()).unwrap_or_default();
        for (index, tool) in tools.iter().enumerate() {
            let slot = placement::tool_slot(position, layout.skill_size, index, layout);
            self.add_tool(goal, id, tool, slot, layout.tool_size)?;
        }
        Ok(Some(id))
    }

    /// Admit a batch of elements atomically
    ///
    /// Duplicates are dropped: nodes and connectors by id, skills by name
    /// (references to the dropped skill are redirected to the one already
    /// present), tools by `(parent, name)` and connectors by endpoint pair.
    /// Every admitted tool ends up with its ownership connector.
    ///
    /// # Errors
    /// Rejects the whole batch on a foreign goal, an unknown skill or tool,
    /// or a connector that is dangling, starts at a tool, points backward,
    /// or claims a tool for a skill that does not own it
    pub fn admit_batch(&mut self, goal: &Goal, elements: &[Element]) -> Result<BatchReport, Rejection> {
        let mut report = BatchReport::default();
        let mut aliases: HashMap<NodeId, NodeId> = HashMap::new();
        let mut names: HashMap<String, NodeId> =
            self.skills().map(|s| (s.name.clone(), s.id)).collect();
        let mut staged_skills: IndexMap<NodeId, SkillNode> = IndexMap::new();
        let mut staged_tools: IndexMap<NodeId, ToolNode> = IndexMap::new();
        let mut staged_connectors: Vec<Connector> = Vec::new();

        for element in elements {
            let Element::Skill(skill) = element else { continue };
            check_geometry(Some(skill.position), Some(skill.size))?;
            if skill.goal_id != *self.goal_id() {
                return Err(Rejection::GoalMismatch {
                    expected: self.goal_id().clone(),
                    found: skill.goal_id.clone(),
                });
            }
            let level = goal.level_of(&skill.name).ok_or_else(|| Rejection::UnknownSkill {
                goal: goal.id.clone(),
                name: skill.name.clone(),
            })?;
            if self.contains_node(skill.id) || staged_skills.contains_key(&skill.id) {
                report.skipped += 1;
                continue;
            }
            if let Some(existing) = names.get(&skill.name) {
                aliases.insert(skill.id, *existing);
                report.skipped += 1;
                continue;
            }
            let mut node = skill.clone();
            node.level = level;
            names.insert(node.name.clone(), node.id);
            staged_skills.insert(node.id, node);
        }

        let resolve = |id: NodeId, aliases: &HashMap<NodeId, NodeId>| *aliases.get(&id).unwrap_or(&id);

        for element in elements {
            let Element::Tool(tool) = element else { continue };
            check_geometry(Some(tool.position), Some(tool.size))?;
            if self.contains_node(tool.id)
                || staged_tools.contains_key(&tool.id)
                || staged_skills.contains_key(&tool.id)
            {
                report.skipped += 1;
                continue;
            }
            let parent = resolve(tool.parent_skill_id, &aliases);
            let parent_name = self
                .skill(parent)
                .or_else(|| staged_skills.get(&parent))
                .map(|s| s.name.clone())
                .ok_or(Rejection::NodeNotFound(tool.parent_skill_id))?;
            if !goal.lists_tool(&parent_name, &tool.name) {
                return Err(Rejection::UnknownTool {
                    skill: parent_name,
                    tool: tool.name.clone(),
                });
            }
            let duplicate = self
                .tool_by_name(parent, &tool.name)
                .map(|t| t.id)
                .or_else(|| {
                    staged_tools
                        .values()
                        .find(|t| t.parent_skill_id == parent && t.name == tool.name)
                        .map(|t| t.id)
                });
            if let Some(existing) = duplicate {
                aliases.insert(tool.id, existing);
                report.skipped += 1;
                continue;
            }
            let mut node = tool.clone();
            node.parent_skill_id = parent;
            staged_tools.insert(node.id, node);
        }

        let mut pairs: HashSet<(NodeId, NodeId)> = self.connectors().map(Connector::endpoints).collect();
        let mut connector_ids: HashSet<ConnectorId> = HashSet::new();

        for element in elements {
            let Element::Connector(connector) = element else { continue };
            let from = resolve(connector.source_id, &aliases);
            let to = resolve(connector.target_id, &aliases);
            if self.connector(connector.id).is_some() || !connector_ids.insert(connector.id) {
                report.skipped += 1;
                continue;
            }
            if from == to {
                return Err(invalid(from, to, "self loop"));
            }
            if pairs.contains(&(from, to)) {
                report.skipped += 1;
                continue;
            }

            let endpoint = |id: NodeId| -> Option<Endpoint> {
                self.skill(id)
                    .or_else(|| staged_skills.get(&id))
                    .map(|s| Endpoint::Skill(s.level))
                    .or_else(|| {
                        self.tool(id)
                            .or_else(|| staged_tools.get(&id))
                            .map(|t| Endpoint::Tool(t.parent_skill_id))
                    })
            };

            let connection_type = match (endpoint(from), endpoint(to)) {
                (None, _) => return Err(invalid(from, to, "unknown source node")),
                (_, None) => return Err(invalid(from, to, "unknown target node")),
                (Some(Endpoint::Tool(_)), _) => {
                    return Err(invalid(from, to, "tools cannot be connector sources"))
                }
                (Some(Endpoint::Skill(_)), Some(Endpoint::Tool(owner))) => {
                    if owner != from {
                        return Err(invalid(from, to, "tool connectors must start at the owning skill"));
                    }
                    ConnectionType::Normal
                }
                (Some(Endpoint::Skill(a)), Some(Endpoint::Skill(b))) => {
                    if a >= b {
                        return Err(invalid(from, to, "skill connectors must point to a higher level"));
                    }
                    ConnectionType::for_gap(b - a)
                }
            };

            pairs.insert((from, to));
            staged_connectors.push(Connector {
                id: connector.id,
                source_id: from,
                target_id: to,
                connection_type,
            });
        }

        for (id, skill) in staged_skills {
            report.admitted.push(id);
            self.insert_skill(skill);
        }
        let tool_parents: Vec<(NodeId, NodeId)> =
            staged_tools.values().map(|t| (t.parent_skill_id, t.id)).collect();
        for (id, tool) in staged_tools {
            report.admitted.push(id);
            self.insert_tool(tool);
        }
        for connector in staged_connectors {
            report.connectors.push(self.insert_connector(connector));
        }
        for (parent, tool) in tool_parents {
            if self.connector_between(parent, tool).is_none() {
                report.connectors.push(self.connect(parent, tool, ConnectionType::Normal));
            }
        }

        tracing::debug!(
            admitted = report.admitted.len(),
            connectors = report.connectors.len(),
            skipped = report.skipped,
            "batch admitted"
        );
        Ok(report)
    }

    /// Remove nodes with cascade
    ///
    /// A skill takes along every skill reachable from it above its level, the
    /// tools of every removed skill, and every connector touching a removed
    /// node.
    ///
    /// # Errors
    /// Returns [`Rejection::NodeNotFound`] for an unknown id and
    /// [`Rejection::LastSkill`] when no skill would remain
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> Result<Removal, Rejection> {
        let mut skills: IndexSet<NodeId> = IndexSet::new();
        let mut tools: IndexSet<NodeId> = IndexSet::new();

        for id in ids {
            if self.skill(*id).is_some() {
                skills.insert(*id);
                skills.extend(self.descendants_above(*id));
            } else if self.tool(*id).is_some() {
                tools.insert(*id);
            } else {
                return Err(Rejection::NodeNotFound(*id));
            }
        }

        if !skills.is_empty() && skills.len() >= self.skill_count() {
            return Err(Rejection::LastSkill);
        }

        tools.extend(
            self.tools()
                .filter(|t| skills.contains(&t.parent_skill_id))
                .map(|t| t.id),
        );

        let before = self.connector_count();
        self.retain_connectors(|_, c| {
            !(skills.contains(&c.source_id)
                || skills.contains(&c.target_id)
                || tools.contains(&c.source_id)
                || tools.contains(&c.target_id))
        });

        let removal = Removal {
            skills: skills.iter().filter_map(|id| self.remove_skill(*id)).collect(),
            tools: tools.iter().filter_map(|id| self.remove_tool(*id)).collect(),
            connectors: before - self.connector_count(),
        };
        tracing::debug!(
            skills = removal.skills.len(),
            tools = removal.tools.len(),
            connectors = removal.connectors,
            "nodes removed"
        );
        Ok(removal)
    }

    /// Move nodes; a moved skill carries its tools along
    ///
    /// Unknown ids are ignored since drag input may trail a delete. Returns
    /// the ids that moved.
    ///
    /// # Errors
    /// Returns [`Rejection::InvalidGeometry`] for a non-finite delta
    pub fn translate(&mut self, ids: &[NodeId], delta: Offset) -> Result<Vec<NodeId>, Rejection> {
        if !delta.is_finite() {
            return Err(Rejection::InvalidGeometry("move delta is not finite"));
        }
        let mut moved: IndexSet<NodeId> = IndexSet::new();
        for id in ids {
            if self.skill(*id).is_some() {
                moved.insert(*id);
                moved.extend(self.tools_of(*id).map(|t| t.id));
            } else if self.tool(*id).is_some() {
                moved.insert(*id);
            } else {
                tracing::trace!(node = %id, "ignoring move of unknown node");
            }
        }
        if delta.is_zero() {
            return Ok(Vec::new());
        }
        for id in &moved {
            if let Some(skill) = self.skill_mut(*id) {
                skill.position = skill.position.translated(delta);
            } else if let Some(tool) = self.tool_mut(*id) {
                tool.position = tool.position.translated(delta);
            }
        }
        Ok(moved.into_iter().collect())
    }

    /// Apply a position/size patch
    ///
    /// # Errors
    /// Returns [`Rejection::NodeNotFound`] for an unknown id and
    /// [`Rejection::InvalidGeometry`] for a non-finite position or a
    /// non-finite or negative size
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> Result<(), Rejection> {
        check_geometry(patch.position, patch.size)?;
        if let Some(skill) = self.skill_mut(id) {
            if let Some(position) = patch.position {
                skill.position = position;
            }
            if let Some(size) = patch.size {
                skill.size = size;
            }
            return Ok(());
        }
        let tool = self.tool_mut(id).ok_or(Rejection::NodeNotFound(id))?;
        if let Some(position) = patch.position {
            tool.position = position;
        }
        if let Some(size) = patch.size {
            tool.size = size;
        }
        Ok(())
    }
}

fn check_geometry(position: Option<Position>, size: Option<Size>) -> Result<(), Rejection> {
    if position.is_some_and(|p| !p.is_finite()) {
        return Err(Rejection::InvalidGeometry("position is not finite"));
    }
    if size.is_some_and(|s| !s.is_valid()) {
        return Err(Rejection::InvalidGeometry("size must be finite and not negative"));
    }
    Ok(())
}

fn invalid(from: NodeId, to: NodeId, reason: &'static str) -> Rejection {
    Rejection::InvalidConnector { from, to, reason }
}
