//! "Place next to" hints for engine-created nodes
//!
//! The renderer owns real layout. These helpers only keep new nodes from
//! stacking on top of each other.

use super::roadmap::Roadmap;
use crate::config::LayoutConfig;
use crate::types::{Position, Size};

/// Slot `index` in the column to the right of `anchor`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn beside(anchor: Position, anchor_size: Size, index: usize, layout: &LayoutConfig) -> Position {
    let step = layout.skill_size.height + layout.row_gap;
    Position::new(
        anchor.x + anchor_size.width + layout.column_gap,
        anchor.y + step * index as f64,
    )
}

/// Slot `index` in the tool row below a skill
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tool_slot(parent: Position, parent_size: Size, index: usize, layout: &LayoutConfig) -> Position {
    let step = layout.tool_size.width + layout.tool_gap;
    Position::new(
        parent.x + step * index as f64,
        parent.y + parent_size.height + layout.row_gap,
    )
}

/// First free slot right of every skill on the roadmap
#[must_use]
pub fn after_rightmost(roadmap: &Roadmap, layout: &LayoutConfig) -> Position {
    match roadmap.rightmost_skill() {
        Some(skill) => beside(skill.position, skill.size, 0, layout),
        None => Position::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkillNode;
    use roadmap_dataset::GoalId;

    #[test]
    fn beside_moves_right_and_down() {
        let layout = LayoutConfig::default();
        let size = layout.skill_size;
        let first = beside(Position::default(), size, 0, &layout);
        let second = beside(Position::default(), size, 1, &layout);
        assert!(first.x > size.width);
        assert!((first.x - second.x).abs() < f64::EPSILON);
        assert!(second.y > first.y);
    }

    #[test]
    fn empty_roadmap_starts_at_origin() {
        let layout = LayoutConfig::default();
        let mut roadmap = Roadmap::new(GoalId::from("g"));
        assert_eq!(after_rightmost(&roadmap, &layout), Position::default());

        roadmap.insert_skill(SkillNode::new(
            GoalId::from("g"),
            "A",
            1,
            Position::new(400.0, 0.0),
            layout.skill_size,
        ));
        assert!(after_rightmost(&roadmap, &layout).x > 400.0 + layout.skill_size.width);
    }
}
