//! Goal identifiers and composite skill keys

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Dataset goal identifier
///
/// Datasets in the wild use both numeric and string ids, so deserialization
/// accepts either; the id is always serialized back as a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GoalId(pub String);

impl GoalId {
    /// Create a goal id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GoalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GoalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for GoalId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGoalId {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for GoalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawGoalId::deserialize(deserializer)? {
            RawGoalId::Number(n) => Self::from(n),
            RawGoalId::Text(s) => Self(s),
        })
    }
}

/// Logical identity of a skill: `(goal, name)`
///
/// Kept as a real pair so names containing separator characters can never
/// collide with another goal's skill.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillKey {
    /// Owning goal
    pub goal: GoalId,
    /// Skill name as listed in the dataset
    pub name: String,
}

impl SkillKey {
    /// Create a key
    #[inline]
    #[must_use]
    pub fn new(goal: GoalId, name: impl Into<String>) -> Self {
        Self {
            goal,
            name: name.into(),
        }
    }
}

impl fmt::Display for SkillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:?}", self.goal, self.name)
    }
}
