//! Engine configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! history_limit = 100
//! move_debounce_ms = 16
//!
//! [layout]
//! column_gap = 120.0
//! row_gap = 40.0
//! ```

use crate::error::ConfigError;
use crate::types::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum undo depth; the oldest snapshot is dropped beyond it
    pub history_limit: usize,
    /// Drag coalescing window in milliseconds (16 ms is ~60 Hz)
    pub move_debounce_ms: u64,
    /// Placement of engine-created nodes
    pub layout: LayoutConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With undo depth
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With drag coalescing window
    #[inline]
    #[must_use]
    pub fn with_move_debounce(mut self, window: Duration) -> Self {
        self.move_debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With layout
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Drag coalescing window
    #[inline]
    #[must_use]
    pub fn move_debounce(&self) -> Duration {
        Duration::from_millis(self.move_debounce_ms)
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Returns error if the file is unreadable or invalid
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error when a value cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()));
        }
        self.layout.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            move_debounce_ms: 16,
            layout: LayoutConfig::default(),
        }
    }
}

/// Placement hints for nodes the engine creates itself
///
/// Only relative placement lives here; everything else about geometry belongs
/// to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Default skill size
    pub skill_size: Size,
    /// Default tool size
    pub tool_size: Size,
    /// Horizontal gap between a node and the one placed beside it
    pub column_gap: f64,
    /// Vertical gap between stacked nodes
    pub row_gap: f64,
    /// Horizontal gap between sibling tools
    pub tool_gap: f64,
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [self.skill_size, self.tool_size];
        if sizes.iter().any(|s| s.width <= 0.0 || s.height <= 0.0) {
            return Err(ConfigError::Invalid("node sizes must be positive".into()));
        }
        if self.column_gap < 0.0 || self.row_gap < 0.0 || self.tool_gap < 0.0 {
            return Err(ConfigError::Invalid("gaps must not be negative".into()));
        }
        Ok(())
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            skill_size: Size::new(180.0, 56.0),
            tool_size: Size::new(120.0, 36.0),
            column_gap: 120.0,
            row_gap: 40.0,
            tool_gap: 16.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("history_limit = 5\n[layout]\nrow_gap = 10.0\n").unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.move_debounce(), Duration::from_millis(16));
        assert!((config.layout.row_gap - 10.0).abs() < f64::EPSILON);
        assert!((config.layout.column_gap - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_history_is_invalid() {
        let err = EngineConfig::from_toml_str("history_limit = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_gap_is_invalid() {
        let layout = LayoutConfig {
            row_gap: -1.0,
            ..LayoutConfig::default()
        };
        assert!(EngineConfig::new().with_layout(layout).validate().is_err());
    }
}
