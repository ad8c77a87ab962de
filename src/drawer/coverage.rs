use crate::prelude::HashMap;

/// Per-frame record of which tiles are fully opaque, used to skip drawing
/// coarser tiles hidden beneath finer ones.
///
/// A cell that was never set counts as covering; a level that was not reset
/// this frame provides no coverage.
#[derive(Debug, Default, Clone)]
pub struct Coverage {
    levels: HashMap<u32, HashMap<(i64, i64), bool>>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything known about `level` for a new frame
    pub fn reset(&mut self, level: u32) {
        self.levels.insert(level, HashMap::default());
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn set(&mut self, level: u32, x: i64, y: i64, covers: bool) {
        match self.levels.get_mut(&level) {
            Some(cells) => {
                cells.insert((x, y), covers);
            }
            None => log::warn!(
                "setting coverage for level {} before it was reset this frame",
                level
            ),
        }
    }

    /// Whether every tile considered at `level` is opaque
    pub fn provides_coverage(&self, level: u32) -> bool {
        match self.levels.get(&level) {
            Some(cells) => cells.values().all(|covers| *covers),
            None => false,
        }
    }

    /// Whether the tile at `(x, y)` is opaque, or was never considered
    pub fn provides_coverage_at(&self, level: u32, x: i64, y: i64) -> bool {
        match self.levels.get(&level) {
            Some(cells) => cells.get(&(x, y)).copied().unwrap_or(true),
            None => false,
        }
    }

    /// Whether the four tiles one level finer than `(level, x, y)` all
    /// provide coverage
    pub fn is_covered(&self, level: u32, x: i64, y: i64) -> bool {
        let child = level + 1;
        let (x, y) = (2 * x, 2 * y);
        self.provides_coverage_at(child, x, y)
            && self.provides_coverage_at(child, x, y + 1)
            && self.provides_coverage_at(child, x + 1, y)
            && self.provides_coverage_at(child, x + 1, y + 1)
    }
}
