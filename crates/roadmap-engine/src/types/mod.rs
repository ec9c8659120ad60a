//! Graph element types
//!
//! Skills, tools and connectors as the engine stores them and hands them to
//! the rendering layer.

use roadmap_dataset::GoalId;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique node identifier (ULID, generated at creation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Ulid);

impl NodeId {
    /// Generate new node ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique connector identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub Ulid);

impl ConnectorId {
    /// Generate new connector ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canvas position (opaque to the engine beyond "place next to")
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift by an offset
    #[inline]
    #[must_use]
    pub fn translated(self, delta: Offset) -> Self {
        Self {
            x: self.x + delta.dx,
            y: self.y + delta.dy,
        }
    }

    /// Whether both coordinates are finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Relative movement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    /// Horizontal delta
    pub dx: f64,
    /// Vertical delta
    pub dy: f64,
}

impl Offset {
    /// Create an offset
    #[inline]
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Whether the offset moves nothing
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    /// Whether both deltas are finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

impl std::ops::Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

/// Node dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Size {
    /// Create a size
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Finite and not negative
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

/// How a skill entered the roadmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeOrigin {
    /// Added by the user (drag/drop, search pick, batch paste)
    #[default]
    Manual,
    /// Created because its prerequisite was completed
    Materialized,
    /// Spliced in after a click on another goal's skill
    CrossGoal,
    /// Imported from a CV
    CvImport,
}

/// Learnable competency on a goal's roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillNode {
    /// Node id
    pub id: NodeId,
    /// Owning goal
    pub goal_id: GoalId,
    /// Dataset skill name
    pub name: String,
    /// Dataset level
    pub level: u32,
    /// Completion flag
    pub completed: bool,
    /// Canvas position
    pub position: Position,
    /// Canvas size
    pub size: Size,
    /// Creation path
    #[serde(default)]
    pub origin: NodeOrigin,
}

impl SkillNode {
    /// Create an incomplete skill node with a fresh id
    #[must_use]
    pub fn new(
        goal_id: GoalId,
        name: impl Into<String>,
        level: u32,
        position: Position,
        size: Size,
    ) -> Self {
        Self {
            id: NodeId::new(),
            goal_id,
            name: name.into(),
            level,
            completed: false,
            position,
            size,
            origin: NodeOrigin::Manual,
        }
    }

    /// With origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: NodeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// With completion flag
    #[inline]
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Right edge on the canvas
    #[inline]
    #[must_use]
    pub fn right_edge(&self) -> f64 {
        self.position.x + self.size.width
    }
}

/// Concrete technology owned by one skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolNode {
    /// Node id
    pub id: NodeId,
    /// Dataset tool name
    pub name: String,
    /// Owning skill node
    pub parent_skill_id: NodeId,
    /// Completion flag
    pub completed: bool,
    /// Canvas position
    pub position: Position,
    /// Canvas size
    pub size: Size,
}

impl ToolNode {
    /// Create an incomplete tool node with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>, parent_skill_id: NodeId, position: Position, size: Size) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            parent_skill_id,
            completed: false,
            position,
            size,
        }
    }
}

/// Connector marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Adjacent levels
    #[default]
    Normal,
    /// The target sits more than one level above the source
    Warning,
}

impl ConnectionType {
    /// Marker for a level gap
    #[inline]
    #[must_use]
    pub fn for_gap(gap: u32) -> Self {
        if gap == 1 {
            Self::Normal
        } else {
            Self::Warning
        }
    }
}

/// Directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    /// Connector id
    pub id: ConnectorId,
    /// Source node
    pub source_id: NodeId,
    /// Target node
    pub target_id: NodeId,
    /// Level-gap marker
    #[serde(default)]
    pub connection_type: ConnectionType,
}

impl Connector {
    /// Create a connector with a fresh id
    #[must_use]
    pub fn new(source_id: NodeId, target_id: NodeId, connection_type: ConnectionType) -> Self {
        Self {
            id: ConnectorId::new(),
            source_id,
            target_id,
            connection_type,
        }
    }

    /// `(source, target)` pair
    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.source_id, self.target_id)
    }

    /// Whether the connector touches `node`
    #[inline]
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_id == node || self.target_id == node
    }
}

/// Connector subtype, derived from the endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    /// Prerequisite edge between skills
    SkillToSkill,
    /// Ownership edge from a skill to one of its tools
    SkillToTool,
    /// Anything else: dangling endpoints or a tool as source
    Invalid,
}

/// Unit of rendering output, batch admission and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Element {
    /// Skill node
    Skill(SkillNode),
    /// Tool node
    Tool(ToolNode),
    /// Connector
    Connector(Connector),
}

impl Element {
    /// Node id for skills and tools
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Element::Skill(s) => Some(s.id),
            Element::Tool(t) => Some(t.id),
            Element::Connector(_) => None,
        }
    }

    /// Whether this element is a node
    #[inline]
    #[must_use]
    pub fn is_node(&self) -> bool {
        !matches!(self, Element::Connector(_))
    }
}

/// Borrowed view of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    /// Skill
    Skill(&'a SkillNode),
    /// Tool
    Tool(&'a ToolNode),
}

impl NodeRef<'_> {
    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Skill(s) => s.id,
            NodeRef::Tool(t) => t.id,
        }
    }

    /// Node name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Skill(s) => &s.name,
            NodeRef::Tool(t) => &t.name,
        }
    }

    /// Whether this is a tool
    #[inline]
    #[must_use]
    pub fn is_tool(&self) -> bool {
        matches!(self, NodeRef::Tool(_))
    }
}

/// Position/size patch for `UpdateNode`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePatch {
    /// New position
    #[serde(default)]
    pub position: Option<Position>,
    /// New size
    #[serde(default)]
    pub size: Option<Size>,
}

impl NodePatch {
    /// Whether the patch changes nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.size.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_marker() {
        assert_eq!(ConnectionType::for_gap(1), ConnectionType::Normal);
        assert_eq!(ConnectionType::for_gap(2), ConnectionType::Warning);
    }

    #[test]
    fn element_json_is_tagged() {
        let c = Connector::new(NodeId::new(), NodeId::new(), ConnectionType::Warning);
        let json = serde_json::to_value(Element::Connector(c)).unwrap();
        assert_eq!(json["type"], "connector");
        assert_eq!(json["connectionType"], "warning");
    }
}
