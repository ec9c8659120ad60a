//! Roadmap Engine - invariant-preserving skill graph
//!
//! Keeps one roadmap per career goal and guarantees, after every intent:
//! 1. **Level adjacency**: each skill links to the skills of the nearest
//!    higher dataset level, and only to those
//! 2. **Tool ownership**: each tool hangs off exactly one parent skill
//! 3. **Propagation**: completing a skill completes it on every roadmap
//! 4. **Atomicity**: a refused intent leaves nothing behind and is
//!    undoable as a whole when it succeeds
//!
//! # Quick Start
//!
//! ```rust
//! use roadmap_engine::prelude::*;
//! use roadmap_dataset::samples;
//! use std::sync::Arc;
//!
//! let dataset = Arc::new(samples::frontend());
//! let goal = GoalId::from(samples::FRONTEND);
//! let mut engine = RoadmapEngine::new(dataset, EngineConfig::default(), goal).unwrap();
//!
//! let html = engine.add_skill_after_rightmost("HTML").unwrap().created[0];
//! engine.add_skill_after_rightmost("CSS").unwrap();
//! assert_eq!(engine.roadmap().connector_count(), 1);
//!
//! let outcome = engine.apply(Intent::ToggleCompletion { id: html }).unwrap();
//! assert!(outcome.completion.unwrap().completed);
//! ```

// Graph model
pub mod error;
pub mod types;

// Core modules
pub mod completion;
pub mod config;
pub mod invariants;
pub mod reconcile;
pub mod store;

// Dispatch
pub mod coalesce;
pub mod engine;
pub mod history;
pub mod intent;

// Outer surfaces
pub mod persistence;

// Test harness
pub mod test_harness;

pub use config::{EngineConfig, LayoutConfig};
pub use engine::{RoadmapEngine, ViewState};
pub use error::{ConfigError, EngineError, PersistenceError, Rejection};
pub use intent::{Intent, Outcome};
pub use store::{GraphState, Roadmap, Suggestion};
pub use types::*;

/// Re-export the test harness for the CLI and integration tests
pub use test_harness::{run_simulator, SimulatorConfig, TestHarness};

/// Common imports for driving the engine
pub mod prelude {
    pub use crate::coalesce::MoveCoalescer;
    pub use crate::completion::CompletionReport;
    pub use crate::config::{EngineConfig, LayoutConfig};
    pub use crate::engine::RoadmapEngine;
    pub use crate::error::{EngineError, Rejection};
    pub use crate::intent::{Intent, Outcome};
    pub use crate::persistence::{spawn_persistence, JsonFileSink, MemorySink, PersistedState, PersistenceSink};
    pub use crate::reconcile::{SpliceReport, SwitchReport, Trigger, TriggerSource};
    pub use crate::store::{GraphState, Roadmap, Suggestion};
    pub use crate::types::{
        ConnectionType, Connector, ConnectorKind, Element, NodeId, NodeOrigin, NodePatch, Offset, Position, Size,
        SkillNode, ToolNode,
    };
    pub use roadmap_dataset::{Dataset, Goal, GoalId, SkillKey};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
///
/// With the `strict-debug` feature an audit failure after a commit panics
/// instead of being logged.
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
