//! Error types for dataset loading

use crate::ids::GoalId;

/// Dataset loading errors
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// JSON could not be parsed into goals
    #[error("malformed dataset: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Dataset file could not be read
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// Two goals share an id
    #[error("duplicate goal id: {0}")]
    DuplicateGoal(GoalId),

    /// A goal lists no skills, so no roadmap could ever be built for it
    #[error("goal {0} has no skills")]
    EmptyGoal(GoalId),

    /// A skill name is blank
    #[error("goal {goal} contains a skill with an empty name")]
    BlankSkillName {
        /// Offending goal
        goal: GoalId,
    },
}
