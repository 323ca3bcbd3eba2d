//! Collection navigation
//!
//! Tracks the active index into the bound target collection and computes
//! wraparound steps. Reloading the new target is the engine's job.

use serde::{Deserialize, Serialize};

/// Navigation direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Previous target
    Left,
    /// Next target
    Right,
}

impl Direction {
    /// Parse `"left"`/`"right"` (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" | "prev" | "previous" => Some(Self::Left),
            "right" | "next" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Index over a bounded collection (`len >= 1`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    len: usize,
}

impl Default for Navigator {
    fn default() -> Self {
        Self { index: 0, len: 1 }
    }
}

impl Navigator {
    /// Bind to a collection, clamping the requested start index into range
    ///
    /// Single-target collections always start at 0.
    #[must_use]
    pub fn bind(len: usize, requested: i64) -> Self {
        let len = len.max(1);
        let index = if len == 1 {
            0
        } else {
            let max = i64::try_from(len - 1).unwrap_or(i64::MAX);
            usize::try_from(requested.clamp(0, max)).unwrap_or(0)
        };
        Self { index, len }
    }

    /// Current index
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Collection length
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a bound collection holds at least one target
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether multi-target navigation applies
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.len > 1
    }

    /// Index one step away, wrapping in both directions
    #[must_use]
    pub fn peek(&self, direction: Direction) -> usize {
        match direction {
            Direction::Left => (self.index + self.len - 1) % self.len,
            Direction::Right => (self.index + 1) % self.len,
        }
    }

    /// Move one step; returns the new index
    pub fn step(&mut self, direction: Direction) -> usize {
        self.index = self.peek(direction);
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraparound_both_directions() {
        let mut nav = Navigator::bind(3, 0);
        assert_eq!(nav.step(Direction::Left), 2);
        assert_eq!(nav.step(Direction::Right), 0);
        assert_eq!(nav.step(Direction::Right), 1);
    }

    #[test]
    fn test_every_index_wraps() {
        for n in 1..6 {
            let last = Navigator::bind(n, i64::try_from(n).unwrap() - 1);
            assert_eq!(last.peek(Direction::Right), 0);
            let first = Navigator::bind(n, 0);
            assert_eq!(first.peek(Direction::Left), n - 1);
        }
    }

    #[test]
    fn test_bind_clamps_start_index() {
        assert_eq!(Navigator::bind(4, 10).index(), 3);
        assert_eq!(Navigator::bind(4, -2).index(), 0);
        assert_eq!(Navigator::bind(1, 3).index(), 0);
        assert_eq!(Navigator::bind(0, 0).len(), 1);
    }

    #[test]
    fn test_enabled_only_for_collections() {
        assert!(!Navigator::bind(1, 0).is_enabled());
        assert!(Navigator::bind(2, 0).is_enabled());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("Left"), Some(Direction::Left));
        assert_eq!(Direction::parse(" right "), Some(Direction::Right));
        assert_eq!(Direction::parse("up"), None);
    }
}
