//! Dataset index
//!
//! The dataset is loaded once at startup and never mutated. Every lookup the
//! engine performs (levels, next-level skills, tool ownership) goes through
//! [`Goal`].

use crate::error::DatasetError;
use crate::ids::GoalId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Level and tool list of one skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSpec {
    /// Position of the skill in the learning order (lower comes first)
    pub level: u32,
    /// Concrete technologies subordinate to the skill
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

impl SkillSpec {
    /// Skill entry without tools
    #[inline]
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level,
            tools: Vec::new(),
        }
    }

    /// With tools
    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}

/// What a name means within a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// The name is a skill of the goal
    Skill {
        /// Skill name
        name: &'a str,
        /// Skill level
        level: u32,
    },
    /// The name is a tool listed under `parent`
    Tool {
        /// Tool name
        name: &'a str,
        /// Owning skill
        parent: &'a str,
    },
}

/// Immutable dataset entry for one career goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Goal identifier
    pub id: GoalId,
    /// Display name of the goal
    pub goal: String,
    /// Skill table in dataset order
    pub skills: IndexMap<String, SkillSpec>,
}

impl Goal {
    /// Create an empty goal
    #[must_use]
    pub fn new(id: impl Into<GoalId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: name.into(),
            skills: IndexMap::new(),
        }
    }

    /// With an additional skill
    #[must_use]
    pub fn with_skill(mut self, name: impl Into<String>, spec: SkillSpec) -> Self {
        self.skills.insert(name.into(), spec);
        self
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.goal
    }

    /// Look up a skill
    #[inline]
    #[must_use]
    pub fn skill(&self, name: &str) -> Option<&SkillSpec> {
        self.skills.get(name)
    }

    /// Whether the skill table contains `name`
    #[inline]
    #[must_use]
    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    /// Level of a skill
    #[inline]
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<u32> {
        self.skills.get(name).map(|s| s.level)
    }

    /// Skills sitting exactly on `level`, in dataset order
    pub fn skills_at_level(&self, level: u32) -> impl Iterator<Item = (&str, &SkillSpec)> {
        self.skills
            .iter()
            .filter(move |(_, spec)| spec.level == level)
            .map(|(name, spec)| (name.as_str(), spec))
    }

    /// Distinct levels, ascending
    #[must_use]
    pub fn levels(&self) -> Vec<u32> {
        self.skills
            .values()
            .map(|s| s.level)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Lowest level of the goal
    #[must_use]
    pub fn lowest_level(&self) -> Option<u32> {
        self.skills.values().map(|s| s.level).min()
    }

    /// Nearest level strictly above `level`
    #[must_use]
    pub fn next_level_above(&self, level: u32) -> Option<u32> {
        self.skills.values().map(|s| s.level).filter(|l| *l > level).min()
    }

    /// Whether `tool` is listed under `skill`
    #[must_use]
    pub fn lists_tool(&self, skill: &str, tool: &str) -> bool {
        self.skills
            .get(skill)
            .is_some_and(|s| s.tools.iter().any(|t| t == tool))
    }

    /// Skill owning `tool`
    ///
    /// A tool listed under several skills belongs to the lowest-level one;
    /// dataset order breaks ties.
    #[must_use]
    pub fn parent_of_tool(&self, tool: &str) -> Option<&str> {
        self.skills
            .iter()
            .filter(|(_, spec)| spec.tools.iter().any(|t| t == tool))
            .min_by_key(|(_, spec)| spec.level)
            .map(|(name, _)| name.as_str())
    }

    /// Decide whether `name` is a skill or a tool of this goal
    ///
    /// Skills win when a name is both.
    #[must_use]
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<Resolved<'a>> {
        if let Some((key, spec)) = self.skills.get_key_value(name) {
            return Some(Resolved::Skill {
                name: key.as_str(),
                level: spec.level,
            });
        }
        let parent = self.parent_of_tool(name)?;
        let tool = self.skills[parent]
            .tools
            .iter()
            .find(|t| *t == name)
            .map(String::as_str)?;
        Some(Resolved::Tool { name: tool, parent })
    }

    fn validate(&self) -> Result<(), DatasetError> {
        if self.skills.is_empty() {
            return Err(DatasetError::EmptyGoal(self.id.clone()));
        }
        if self.skills.keys().any(|name| name.trim().is_empty()) {
            return Err(DatasetError::BlankSkillName {
                goal: self.id.clone(),
            });
        }
        Ok(())
    }
}

/// The full, read-only dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    goals: IndexMap<GoalId, Goal>,
}

impl Dataset {
    /// Build a dataset from goals
    ///
    /// # Errors
    /// Returns error on duplicate goal ids, goals without skills or blank
    /// skill names
    pub fn from_goals(goals: impl IntoIterator<Item = Goal>) -> Result<Self, DatasetError> {
        let mut index = IndexMap::new();
        for goal in goals {
            goal.validate()?;
            if index.contains_key(&goal.id) {
                return Err(DatasetError::DuplicateGoal(goal.id));
            }
            index.insert(goal.id.clone(), goal);
        }
        tracing::debug!(goals = index.len(), "dataset indexed");
        Ok(Self { goals: index })
    }

    /// Parse the `[{ id, goal, skills }]` JSON format
    ///
    /// # Errors
    /// Returns error on malformed JSON or an invalid goal table
    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let goals: Vec<Goal> = serde_json::from_str(json)?;
        Self::from_goals(goals)
    }

    /// Load a dataset file
    ///
    /// # Errors
    /// Returns error if the file is unreadable or invalid
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Look up a goal
    #[inline]
    #[must_use]
    pub fn goal(&self, id: &GoalId) -> Option<&Goal> {
        self.goals.get(id)
    }

    /// Whether the dataset knows `id`
    #[inline]
    #[must_use]
    pub fn contains_goal(&self, id: &GoalId) -> bool {
        self.goals.contains_key(id)
    }

    /// All goals in dataset order
    pub fn goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.values()
    }

    /// Number of goals
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Whether there are no goals
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Goals whose skill table contains `skill`
    #[must_use]
    pub fn goals_with_skill(&self, skill: &str) -> Vec<&GoalId> {
        self.goals
            .values()
            .filter(|g| g.has_skill(skill))
            .map(|g| &g.id)
            .collect()
    }

    /// Per-goal statistics
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let goals = self
            .goals
            .values()
            .map(|goal| {
                let levels = goal.levels();
                let level_gaps = levels
                    .windows(2)
                    .filter(|w| w[1] - w[0] > 1)
                    .map(|w| (w[0], w[1]))
                    .collect();
                GoalSummary {
                    id: goal.id.clone(),
                    name: goal.goal.clone(),
                    skills: goal.skills.len(),
                    tools: goal.skills.values().map(|s| s.tools.len()).sum(),
                    levels,
                    level_gaps,
                }
            })
            .collect();
        DatasetSummary { goals }
    }
}

/// Statistics for one goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalSummary {
    /// Goal id
    pub id: GoalId,
    /// Goal name
    pub name: String,
    /// Skill count
    pub skills: usize,
    /// Tool count (tools listed under several skills count once per listing)
    pub tools: usize,
    /// Distinct levels, ascending
    pub levels: Vec<u32>,
    /// Consecutive level pairs further than one apart
    pub level_gaps: Vec<(u32, u32)>,
}

/// Statistics for the whole dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    /// One entry per goal
    pub goals: Vec<GoalSummary>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for goal in &self.goals {
            writeln!(
                f,
                "{} ({}): {} skills, {} tools, levels {:?}",
                goal.name, goal.id, goal.skills, goal.tools, goal.levels
            )?;
            for (from, to) in &goal.level_gaps {
                writeln!(f, "  level gap: {from} -> {to}")?;
            }
        }
        Ok(())
    }
}
