//! Pyramids made of whole pre-rendered images, one per level.

use crate::core::geo::{Point, Rect};
use crate::tiles::source::{GridSize, PyramidGeometry};
use crate::{Result, ViewerError};
use serde::{Deserialize, Serialize};

/// One pre-rendered size of the image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyLevel {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl LegacyLevel {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }
}

/// Each level is a single tile holding the whole image at that size
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTileSource {
    geometry: PyramidGeometry,
    files: Vec<LegacyLevel>,
}

impl LegacyTileSource {
    /// `files` must be ordered from smallest to largest
    pub fn new(files: Vec<LegacyLevel>) -> Result<Self> {
        let largest = files.last().ok_or_else(|| {
            ViewerError::InvalidGeometry("legacy pyramid needs at least one image".to_string())
        })?;
        if files.iter().any(|f| f.width == 0 || f.height == 0) {
            return Err(ViewerError::InvalidGeometry(
                "legacy pyramid images must have a positive size".to_string(),
            ));
        }
        if files
            .windows(2)
            .any(|pair| pair[0].width > pair[1].width || pair[0].height > pair[1].height)
        {
            return Err(ViewerError::InvalidGeometry(
                "legacy pyramid images must be ordered from smallest to largest".to_string(),
            ));
        }

        let geometry = PyramidGeometry::new(
            largest.width,
            largest.height,
            largest.width.max(largest.height),
            0,
            Some(0),
            Some(files.len() as u32 - 1),
        )?;

        Ok(Self { geometry, files })
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        &self.geometry
    }

    pub fn files(&self) -> &[LegacyLevel] {
        &self.files
    }

    fn file(&self, level: u32) -> Option<&LegacyLevel> {
        if level < self.geometry.min_level || level > self.geometry.max_level {
            return None;
        }
        self.files.get(level as usize)
    }

    /// Height of the level's image relative to the largest one, 0 off the pyramid
    pub fn level_scale(&self, level: u32) -> f64 {
        match self.file(level) {
            Some(file) => file.height as f64 / self.geometry.height as f64,
            None => 0.0,
        }
    }

    pub fn num_tiles(&self, level: u32) -> GridSize {
        if self.level_scale(level) > 0.0 {
            GridSize::new(1, 1)
        } else {
            GridSize::new(0, 0)
        }
    }

    pub fn pixel_ratio(&self, level: u32) -> Point {
        let scaled = self.geometry.dimensions().multiply(self.level_scale(level));
        Point::new(1.0 / scaled.x, 1.0 / scaled.y)
    }

    pub fn tile_bounds(&self, level: u32, x: i64, y: i64) -> Rect {
        let file = match self.file(level) {
            Some(file) => file,
            None => return Rect::default(),
        };
        let scaled = self.geometry.dimensions().multiply(self.level_scale(level));
        let (fw, fh) = (file.width as f64, file.height as f64);

        let px = if x == 0 { 0.0 } else { fw };
        let py = if y == 0 { 0.0 } else { fh };
        let sx = fw.min(scaled.x - px);
        let sy = fh.min(scaled.y - py);
        let scale = 1.0 / scaled.x;

        Rect::new(px * scale, py * scale, sx * scale, sy * scale)
    }

    pub fn tile_url(&self, level: u32, _x: i64, _y: i64) -> String {
        self.file(level)
            .map(|file| file.url.clone())
            .unwrap_or_default()
    }

    pub fn tile_exists(&self, level: u32, x: i64, y: i64) -> bool {
        let num_tiles = self.num_tiles(level);
        x >= 0 && y >= 0 && x < num_tiles.x && y < num_tiles.y
    }
}
