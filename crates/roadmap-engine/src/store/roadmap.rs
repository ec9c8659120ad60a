//! Element set of one goal

use crate::types::{
    ConnectionType, Connector, ConnectorId, ConnectorKind, Element, NodeId, NodeRef, SkillNode,
    ToolNode,
};
use indexmap::IndexMap;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use roadmap_dataset::{GoalId, SkillKey};

/// Skills, tools and connectors of exactly one goal
///
/// Element order is insertion order, so element lists handed to the renderer
/// are stable across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Roadmap {
    goal_id: GoalId,
    skills: IndexMap<NodeId, SkillNode>,
    tools: IndexMap<NodeId, ToolNode>,
    connectors: IndexMap<ConnectorId, Connector>,
}

impl Roadmap {
    /// Create an empty roadmap
    #[must_use]
    pub fn new(goal_id: GoalId) -> Self {
        Self {
            goal_id,
            skills: IndexMap::new(),
            tools: IndexMap::new(),
            connectors: IndexMap::new(),
        }
    }

    /// Load raw elements without validation
    ///
    /// Used when restoring persisted data; callers run the validation pass
    /// afterwards.
    #[must_use]
    pub fn from_elements(goal_id: GoalId, elements: impl IntoIterator<Item = Element>) -> Self {
        let mut roadmap = Self::new(goal_id);
        for element in elements {
            match element {
                Element::Skill(s) => {
                    roadmap.skills.insert(s.id, s);
                }
                Element::Tool(t) => {
                    roadmap.tools.insert(t.id, t);
                }
                Element::Connector(c) => {
                    roadmap.connectors.insert(c.id, c);
                }
            }
        }
        roadmap
    }

    /// Owning goal
    #[inline]
    #[must_use]
    pub fn goal_id(&self) -> &GoalId {
        &self.goal_id
    }

    /// Skill nodes in insertion order
    pub fn skills(&self) -> impl Iterator<Item = &SkillNode> {
        self.skills.values()
    }

    /// Tool nodes in insertion order
    pub fn tools(&self) -> impl Iterator<Item = &ToolNode> {
        self.tools.values()
    }

    /// Connectors in insertion order
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    /// Look up a skill
    #[inline]
    #[must_use]
    pub fn skill(&self, id: NodeId) -> Option<&SkillNode> {
        self.skills.get(&id)
    }

    /// Look up a tool
    #[inline]
    #[must_use]
    pub fn tool(&self, id: NodeId) -> Option<&ToolNode> {
        self.tools.get(&id)
    }

    /// Look up a connector
    #[inline]
    #[must_use]
    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&id)
    }

    /// Look up any node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.skills
            .get(&id)
            .map(NodeRef::Skill)
            .or_else(|| self.tools.get(&id).map(NodeRef::Tool))
    }

    /// Whether a skill or tool with this id exists
    #[inline]
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.skills.contains_key(&id) || self.tools.contains_key(&id)
    }

    /// Skill with the given dataset name
    #[must_use]
    pub fn skill_by_name(&self, name: &str) -> Option<&SkillNode> {
        self.skills.values().find(|s| s.name == name)
    }

    /// Tools owned by `skill`
    pub fn tools_of(&self, skill: NodeId) -> impl Iterator<Item = &ToolNode> {
        self.tools.values().filter(move |t| t.parent_skill_id == skill)
    }

    /// Tool named `name` under `parent`
    #[must_use]
    pub fn tool_by_name(&self, parent: NodeId, name: &str) -> Option<&ToolNode> {
        self.tools_of(parent).find(|t| t.name == name)
    }

    /// Number of skills
    #[inline]
    #[must_use]
    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Number of tools
    #[inline]
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Number of connectors
    #[inline]
    #[must_use]
    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Whether the roadmap has no elements at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.tools.is_empty() && self.connectors.is_empty()
    }

    /// Connector from `from` to `to`
    #[must_use]
    pub fn connector_between(&self, from: NodeId, to: NodeId) -> Option<&Connector> {
        self.connectors
            .values()
            .find(|c| c.source_id == from && c.target_id == to)
    }

    /// Classify a connector by its endpoints
    ///
    /// A tool connector is one whose source is a skill and whose target is a
    /// tool; everything else between two skills is a prerequisite edge.
    #[must_use]
    pub fn connector_kind(&self, connector: &Connector) -> ConnectorKind {
        let source = self.node(connector.source_id);
        let target = self.node(connector.target_id);
        match (source, target) {
            (Some(s), Some(t)) if !s.is_tool() && t.is_tool() => ConnectorKind::SkillToTool,
            (Some(s), Some(t)) if !s.is_tool() && !t.is_tool() => ConnectorKind::SkillToSkill,
            _ => ConnectorKind::Invalid,
        }
    }

    /// Prerequisite edges only
    pub fn skill_edges(&self) -> impl Iterator<Item = &Connector> {
        self.connectors
            .values()
            .filter(|c| self.connector_kind(c) == ConnectorKind::SkillToSkill)
    }

    /// Logical keys of all skills
    pub fn skill_keys(&self) -> impl Iterator<Item = SkillKey> + '_ {
        self.skills
            .values()
            .map(|s| SkillKey::new(self.goal_id.clone(), s.name.clone()))
    }

    /// Names of completed skills
    pub fn completed_skill_names(&self) -> impl Iterator<Item = &str> {
        self.skills
            .values()
            .filter(|s| s.completed)
            .map(|s| s.name.as_str())
    }

    /// Skill with the furthest right edge
    #[must_use]
    pub fn rightmost_skill(&self) -> Option<&SkillNode> {
        self.skills
            .values()
            .max_by(|a, b| a.right_edge().total_cmp(&b.right_edge()))
    }

    /// Full element list: skills, then tools, then connectors
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.skills
            .values()
            .cloned()
            .map(Element::Skill)
            .chain(self.tools.values().cloned().map(Element::Tool))
            .chain(self.connectors.values().cloned().map(Element::Connector))
            .collect()
    }

    /// Prerequisite graph over skill nodes
    #[must_use]
    pub fn skill_graph(&self) -> DiGraphMap<NodeId, ConnectionType> {
        let mut graph = DiGraphMap::new();
        for id in self.skills.keys() {
            graph.add_node(*id);
        }
        for c in self.skill_edges() {
            graph.add_edge(c.source_id, c.target_id, c.connection_type);
        }
        graph
    }

    /// Skills reachable from `root` through prerequisite edges whose level is
    /// above the root's
    #[must_use]
    pub fn descendants_above(&self, root: NodeId) -> Vec<NodeId> {
        let Some(root_level) = self.skills.get(&root).map(|s| s.level) else {
            return Vec::new();
        };
        let graph = self.skill_graph();
        let mut dfs = Dfs::new(&graph, root);
        let mut found = Vec::new();
        while let Some(node) = dfs.next(&graph) {
            if node == root {
                continue;
            }
            if self.skills.get(&node).is_some_and(|s| s.level > root_level) {
                found.push(node);
            }
        }
        found
    }

    // Raw mutators. Invariants are restored by the callers.

    pub(crate) fn insert_skill(&mut self, skill: SkillNode) -> NodeId {
        let id = skill.id;
        self.skills.insert(id, skill);
        id
    }

    pub(crate) fn insert_tool(&mut self, tool: ToolNode) -> NodeId {
        let id = tool.id;
        self.tools.insert(id, tool);
        id
    }

    pub(crate) fn insert_connector(&mut self, connector: Connector) -> ConnectorId {
        let id = connector.id;
        self.connectors.insert(id, connector);
        id
    }

    /// Insert a tool together with its ownership connector
    pub(crate) fn attach_tool(&mut self, tool: ToolNode) -> NodeId {
        let parent = tool.parent_skill_id;
        let id = self.insert_tool(tool);
        self.connect(parent, id, ConnectionType::Normal);
        id
    }

    /// Connect two nodes; an existing pair is reused
    pub(crate) fn connect(&mut self, from: NodeId, to: NodeId, kind: ConnectionType) -> ConnectorId {
        if let Some(existing) = self.connector_between(from, to) {
            return existing.id;
        }
        self.insert_connector(Connector::new(from, to, kind))
    }

    pub(crate) fn skill_mut(&mut self, id: NodeId) -> Option<&mut SkillNode> {
        self.skills.get_mut(&id)
    }

    pub(crate) fn tool_mut(&mut self, id: NodeId) -> Option<&mut ToolNode> {
        self.tools.get_mut(&id)
    }

    pub(crate) fn skill_by_name_mut(&mut self, name: &str) -> Option<&mut SkillNode> {
        self.skills.values_mut().find(|s| s.name == name)
    }

    pub(crate) fn skills_mut(&mut self) -> impl Iterator<Item = &mut SkillNode> {
        self.skills.values_mut()
    }

    pub(crate) fn set_connection_type(&mut self, id: ConnectorId, kind: ConnectionType) {
        if let Some(c) = self.connectors.get_mut(&id) {
            c.connection_type = kind;
        }
    }

    pub(crate) fn remove_skill(&mut self, id: NodeId) -> Option<SkillNode> {
        self.skills.shift_remove(&id)
    }

    pub(crate) fn remove_tool(&mut self, id: NodeId) -> Option<ToolNode> {
        self.tools.shift_remove(&id)
    }

    pub(crate) fn remove_connector(&mut self, id: ConnectorId) -> Option<Connector> {
        self.connectors.shift_remove(&id)
    }

    pub(crate) fn retain_skills(&mut self, keep: impl FnMut(&NodeId, &mut SkillNode) -> bool) {
        self.skills.retain(keep);
    }

    pub(crate) fn retain_tools(&mut self, keep: impl FnMut(&NodeId, &mut ToolNode) -> bool) {
        self.tools.retain(keep);
    }

    pub(crate) fn retain_connectors(&mut self, keep: impl FnMut(&ConnectorId, &mut Connector) -> bool) {
        self.connectors.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Size};

    fn skill(name: &str, level: u32, x: f64) -> SkillNode {
        SkillNode::new(
            GoalId::from("g"),
            name,
            level,
            Position::new(x, 0.0),
            Size::new(100.0, 40.0),
        )
    }

    #[test]
    fn connector_kinds_follow_endpoints() {
        let mut roadmap = Roadmap::new(GoalId::from("g"));
        let a = roadmap.insert_skill(skill("A", 1, 0.0));
        let b = roadmap.insert_skill(skill("B", 2, 200.0));
        let t = roadmap.attach_tool(ToolNode::new("T", a, Position::default(), Size::new(1.0, 1.0)));
        let ab = roadmap.connect(a, b, ConnectionType::Normal);
        let tb = roadmap.insert_connector(Connector::new(t, b, ConnectionType::Normal));

        let kind = |id| roadmap.connector_kind(roadmap.connector(id).unwrap());
        assert_eq!(kind(ab), ConnectorKind::SkillToSkill);
        assert_eq!(kind(tb), ConnectorKind::Invalid);
        let owner = roadmap.connector_between(a, t).unwrap();
        assert_eq!(roadmap.connector_kind(owner), ConnectorKind::SkillToTool);
    }

    #[test]
    fn connect_reuses_existing_pair() {
        let mut roadmap = Roadmap::new(GoalId::from("g"));
        let a = roadmap.insert_skill(skill("A", 1, 0.0));
        let b = roadmap.insert_skill(skill("B", 2, 200.0));
        let first = roadmap.connect(a, b, ConnectionType::Normal);
        let second = roadmap.connect(a, b, ConnectionType::Warning);
        assert_eq!(first, second);
        assert_eq!(roadmap.connector_count(), 1);
    }

    #[test]
    fn descendants_stop_at_lower_levels() {
        let mut roadmap = Roadmap::new(GoalId::from("g"));
        let a = roadmap.insert_skill(skill("A", 1, 0.0));
        let b = roadmap.insert_skill(skill("B", 2, 200.0));
        let c = roadmap.insert_skill(skill("C", 3, 400.0));
        roadmap.connect(a, b, ConnectionType::Normal);
        roadmap.connect(b, c, ConnectionType::Normal);

        assert_eq!(roadmap.descendants_above(b), vec![c]);
        let mut all = roadmap.descendants_above(a);
        all.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn rightmost_uses_right_edge() {
        let mut roadmap = Roadmap::new(GoalId::from("g"));
        roadmap.insert_skill(skill("A", 1, 0.0));
        let far = roadmap.insert_skill(skill("B", 2, 500.0));
        assert_eq!(roadmap.rightmost_skill().map(|s| s.id), Some(far));
    }
}
