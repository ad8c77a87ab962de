use crate::core::geo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a tile. `x` and `y` may fall outside the grid on wrapping axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub level: u32,
    pub x: i64,
    pub y: i64,
}

impl TileKey {
    pub fn new(level: u32, x: i64, y: i64) -> Self {
        Self { level, x, y }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}_{}", self.level, self.x, self.y)
    }
}

/// Runtime state of one tile of the open image
#[derive(Debug, Clone)]
pub struct Tile<I> {
    pub key: TileKey,
    /// Normalized bounds, already offset for wrap folding
    pub bounds: Rect,
    pub exists: bool,
    pub url: String,
    pub loaded: bool,
    pub loading: bool,
    pub image: Option<I>,

    pub position: Point,
    pub size: Point,
    pub opacity: f64,
    pub distance: f64,
    pub visibility: f64,
    pub blend_start: Option<f64>,

    pub being_drawn: bool,
    pub last_touch_time: f64,
}

impl<I> Tile<I> {
    pub fn new(key: TileKey, bounds: Rect, exists: bool, url: String) -> Self {
        Self {
            key,
            bounds,
            exists,
            url,
            loaded: false,
            loading: false,
            image: None,
            position: Point::default(),
            size: Point::default(),
            opacity: 0.0,
            distance: 0.0,
            visibility: 0.0,
            blend_start: None,
            being_drawn: false,
            last_touch_time: 0.0,
        }
    }

    pub fn level(&self) -> u32 {
        self.key.level
    }

    pub fn mark_loaded(&mut self, image: I) {
        self.image = Some(image);
        self.loaded = true;
        self.loading = false;
    }

    /// Drops the decoded image so the tile can be loaded again later.
    /// The blend start is kept, so a reloaded tile shows without fading in.
    pub fn unload(&mut self) {
        self.image = None;
        self.loaded = false;
        self.loading = false;
    }
}

impl<I> fmt::Display for Tile<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_lifecycle() {
        let key = TileKey::new(3, 1, 2);
        let mut tile: Tile<Vec<u8>> =
            Tile::new(key, Rect::new(0.0, 0.0, 0.5, 0.5), true, "3/1_2.png".into());

        assert!(!tile.loaded);
        assert_eq!(tile.to_string(), "3/1_2");

        tile.loading = true;
        tile.mark_loaded(vec![1, 2, 3]);
        assert!(tile.loaded);
        assert!(!tile.loading);
        assert_eq!(tile.image.as_deref(), Some(&[1u8, 2, 3][..]));

        tile.blend_start = Some(10.0);
        tile.unload();
        assert!(!tile.loaded);
        assert!(tile.image.is_none());
        assert!(tile.exists);
    }
}
