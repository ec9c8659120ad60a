//! Drag coalescing
//!
//! Pointer moves arrive far faster than anyone wants history entries for.
//! [`MoveCoalescer`] sums the deltas of one drag inside a debounce window
//! and hands out a single [`Intent::MoveNodes`] per window.

use crate::config::EngineConfig;
use crate::intent::Intent;
use crate::types::{NodeId, Offset};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct PendingMove {
    ids: Vec<NodeId>,
    delta: Offset,
    started: Instant,
}

impl PendingMove {
    fn into_intent(self) -> Intent {
        Intent::MoveNodes {
            ids: self.ids,
            delta: self.delta,
        }
    }
}

/// Last-write-wins merge of drag deltas
#[derive(Debug, Clone)]
pub struct MoveCoalescer {
    window: Duration,
    pending: Option<PendingMove>,
}

impl MoveCoalescer {
    /// Coalesce within `window`
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Coalescer using the configured debounce window
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.move_debounce())
    }

    /// Feed one drag step
    ///
    /// Returns an intent to apply when a window closed or the dragged node
    /// set changed; `None` while the current window is still open.
    pub fn push(&mut self, ids: Vec<NodeId>, delta: Offset, now: Instant) -> Option<Intent> {
        match self.pending.take() {
            Some(mut pending) if pending.ids == ids => {
                pending.delta = pending.delta + delta;
                if now.saturating_duration_since(pending.started) >= self.window {
                    return Some(pending.into_intent());
                }
                self.pending = Some(pending);
                None
            }
            previous => {
                self.pending = Some(PendingMove {
                    ids,
                    delta,
                    started: now,
                });
                previous.map(PendingMove::into_intent)
            }
        }
    }

    /// Emit whatever is pending, e.g. on pointer release
    pub fn flush(&mut self) -> Option<Intent> {
        self.pending.take().map(PendingMove::into_intent)
    }

    /// Whether a move is waiting for its window to close
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for MoveCoalescer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_of(intent: Option<Intent>) -> Offset {
        match intent {
            Some(Intent::MoveNodes { delta, .. }) => delta,
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn steps_inside_window_merge() {
        let mut coalescer = MoveCoalescer::new(Duration::from_millis(16));
        let ids = vec![NodeId::new()];
        let start = Instant::now();

        assert!(coalescer.push(ids.clone(), Offset::new(1.0, 0.0), start).is_none());
        assert!(coalescer
            .push(ids.clone(), Offset::new(2.0, 1.0), start + Duration::from_millis(5))
            .is_none());
        let merged = delta_of(coalescer.push(ids, Offset::new(3.0, 0.0), start + Duration::from_millis(16)));
        assert_eq!(merged, Offset::new(6.0, 1.0));
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn new_node_set_flushes_previous_drag() {
        let mut coalescer = MoveCoalescer::default();
        let start = Instant::now();
        coalescer.push(vec![NodeId::new()], Offset::new(1.0, 1.0), start);
        let flushed = delta_of(coalescer.push(vec![NodeId::new()], Offset::new(9.0, 9.0), start));
        assert_eq!(flushed, Offset::new(1.0, 1.0));
        assert_eq!(delta_of(coalescer.flush()), Offset::new(9.0, 9.0));
        assert!(coalescer.flush().is_none());
    }
}
