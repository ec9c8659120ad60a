//! Roadmap Dataset - read-only goal index
//!
//! Static table mapping `goal -> { skill -> { level, tools[] } }` that every
//! roadmap is derived from. It answers:
//! - Which level a skill sits on within a goal
//! - Which skills live on a given level
//! - Which skill owns a tool
//! - Whether a name is a skill or a tool of a goal
//!
//! # Example
//!
//! ```rust
//! use roadmap_dataset::{Dataset, GoalId};
//!
//! let json = r#"[
//!     { "id": 1, "goal": "Frontend", "skills": {
//!         "HTML": { "level": 1, "tools": ["VS Code"] },
//!         "CSS": { "level": 2 }
//!     } }
//! ]"#;
//!
//! let dataset = Dataset::from_json(json).unwrap();
//! let goal = dataset.goal(&GoalId::from("1")).unwrap();
//! assert_eq!(goal.level_of("CSS"), Some(2));
//! assert_eq!(goal.parent_of_tool("VS Code"), Some("HTML"));
//! ```

pub mod dataset;
pub mod error;
pub mod ids;
pub mod samples;

pub use dataset::{Dataset, DatasetSummary, Goal, GoalSummary, Resolved, SkillSpec};
pub use error::DatasetError;
pub use ids::{GoalId, SkillKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
