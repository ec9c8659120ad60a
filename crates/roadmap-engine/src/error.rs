//! Error types for the roadmap engine
//!
//! Three kinds of failure exist:
//! - Rejected mutations ([`Rejection`]): an intent would break an invariant;
//!   state is left untouched and the reason is shown to the user
//! - Stale references: filtered silently during validation, never raised
//! - Persistence failures ([`PersistenceError`]): logged, never fatal

use crate::types::NodeId;
use roadmap_dataset::{DatasetError, GoalId};

/// A refused intent
///
/// Returned whenever applying an intent would leave the graph in an invalid
/// state. The engine guarantees the graph is unchanged when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The delete would leave the roadmap without skills
    #[error("cannot delete the last skill of a roadmap")]
    LastSkill,

    /// Goal is not part of the dataset
    #[error("unknown goal: {0}")]
    UnknownGoal(GoalId),

    /// Skill name is not in the goal's skill table
    #[error("skill {name:?} is not part of goal {goal}")]
    UnknownSkill {
        /// Active goal
        goal: GoalId,
        /// Offending name
        name: String,
    },

    /// Tool is not listed under the chosen parent skill
    #[error("tool {tool:?} is not listed under skill {skill:?}")]
    UnknownTool {
        /// Parent skill name
        skill: String,
        /// Offending tool name
        tool: String,
    },

    /// Node id does not resolve on the active roadmap
    #[error("node {0} is not on the active roadmap")]
    NodeNotFound(NodeId),

    /// Element belongs to another goal
    #[error("element belongs to goal {found}, active goal is {expected}")]
    GoalMismatch {
        /// Active goal
        expected: GoalId,
        /// Goal carried by the element
        found: GoalId,
    },

    /// Connector endpoints are missing or of the wrong kind
    #[error("connector {from} -> {to} rejected: {reason}")]
    InvalidConnector {
        /// Source endpoint
        from: NodeId,
        /// Target endpoint
        to: NodeId,
        /// Why the connector is not admissible
        reason: &'static str,
    },

    /// Position, offset or size is NaN, infinite or negative
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

impl Rejection {
    /// Human-readable reason
    #[inline]
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Whether the refusal should surface as a warning to the user
    ///
    /// Other refusals come from stale UI input and are only logged.
    #[inline]
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::LastSkill | Self::UnknownSkill { .. } | Self::UnknownTool { .. })
    }
}

/// Failure of the fire-and-forget save
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Snapshot could not be encoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failed
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store refused the snapshot
    #[error("sink rejected snapshot: {0}")]
    Rejected(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// File could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A value is out of range
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Engine construction and restore errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Dataset failed to load
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Configuration failed to load
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Goal is not part of the dataset
    #[error("unknown goal: {0}")]
    UnknownGoal(GoalId),

    /// Intent refused
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Persistence plumbing failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
