//! Closed set of commands the engine accepts, and what applying one did

use crate::completion::CompletionReport;
use crate::reconcile::{SpliceReport, SwitchReport, Trigger};
use crate::store::Suggestion;
use crate::types::{Element, NodeId, NodePatch, Offset, Position};
use roadmap_dataset::GoalId;
use serde::{Deserialize, Serialize};

/// A user or system command
///
/// Serializable so scripted sessions can be replayed from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Intent {
    /// Add a skill, or a tool when `parent` is set
    AddNode {
        /// Dataset name
        name: String,
        /// Drop position
        #[serde(default)]
        position: Position,
        /// Owning skill for tools
        #[serde(default)]
        parent: Option<NodeId>,
    },
    /// Admit a batch of elements atomically
    AddNodes {
        /// Elements to admit
        elements: Vec<Element>,
    },
    /// Change position or size
    UpdateNode {
        /// Node
        id: NodeId,
        /// New geometry
        patch: NodePatch,
    },
    /// Delete a node with cascade
    RemoveNode {
        /// Node
        id: NodeId,
    },
    /// Flip a completion flag
    ToggleCompletion {
        /// Node
        id: NodeId,
    },
    /// Move nodes by a delta
    MoveNodes {
        /// Nodes
        ids: Vec<NodeId>,
        /// Delta
        delta: Offset,
    },
    /// Replace or extend the selection
    Select {
        /// Nodes
        ids: Vec<NodeId>,
        /// Extend instead of replace
        #[serde(default)]
        additive: bool,
    },
    /// Move the selection by a delta
    MoveSelected {
        /// Delta
        delta: Offset,
    },
    /// Delete the selection with cascade
    DeleteSelected,
    /// Activate another goal, optionally splicing in the skill that caused it
    SwitchGoal {
        /// Target goal
        goal: GoalId,
        /// Clicked or imported skill
        #[serde(default)]
        trigger: Option<Trigger>,
    },
    /// Splice an externally discovered skill into the active goal
    ImportSkill {
        /// Skill or tool
        trigger: Trigger,
    },
    /// Add the pending suggestion's skills
    AcceptSuggestions,
    /// Drop the pending suggestion
    DismissSuggestions,
    /// Materialize the whole active goal
    AutoBuild,
    /// Show or hide a skill's tools
    ToggleFold {
        /// Skill
        skill: NodeId,
    },
    /// Restore the previous state
    Undo,
    /// Re-apply an undone state
    Redo,
}

impl Intent {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::AddNodes { .. } => "add_nodes",
            Self::UpdateNode { .. } => "update_node",
            Self::RemoveNode { .. } => "remove_node",
            Self::ToggleCompletion { .. } => "toggle_completion",
            Self::MoveNodes { .. } => "move_nodes",
            Self::Select { .. } => "select",
            Self::MoveSelected { .. } => "move_selected",
            Self::DeleteSelected => "delete_selected",
            Self::SwitchGoal { .. } => "switch_goal",
            Self::ImportSkill { .. } => "import_skill",
            Self::AcceptSuggestions => "accept_suggestions",
            Self::DismissSuggestions => "dismiss_suggestions",
            Self::AutoBuild => "auto_build",
            Self::ToggleFold { .. } => "toggle_fold",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }

    /// Whether the intent only touches selection or folding
    #[must_use]
    pub fn is_view_only(&self) -> bool {
        matches!(self, Self::Select { .. } | Self::ToggleFold { .. })
    }
}

/// Effects of an applied intent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the graph state changed (and a history entry was recorded)
    pub changed: bool,
    /// Nodes created, materialization included
    pub created: Vec<NodeId>,
    /// Nodes removed
    pub removed: Vec<NodeId>,
    /// Nodes moved
    pub moved: Vec<NodeId>,
    /// Completion toggle details
    pub completion: Option<CompletionReport>,
    /// Goal switch details
    pub switch: Option<SwitchReport>,
    /// Trigger splice details
    pub splice: Option<SpliceReport>,
    /// Suggestion surfaced by this intent
    pub suggestion: Option<Suggestion>,
}

impl Outcome {
    /// Outcome of an intent that did nothing
    #[inline]
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }
}
