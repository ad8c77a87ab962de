use crate::core::geo::{DisplayRect, Point, Rect};
use crate::prelude::HashMap;
use crate::tiles::legacy::LegacyTileSource;
use crate::{Result, ViewerError};
use std::fmt;
use std::sync::Arc;

/// Image formats a DZI pyramid may be served in, and whether we can draw them
const DZI_FORMATS: [(&str, bool); 6] = [
    ("bmp", false),
    ("jpeg", true),
    ("jpg", true),
    ("png", true),
    ("tif", false),
    ("wdp", false),
];

/// Number of tile columns and rows at a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub x: i64,
    pub y: i64,
}

impl GridSize {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Static geometry of a tile pyramid and the queries shared by every source
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidGeometry {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub tile_overlap: u32,
    pub min_level: u32,
    pub max_level: u32,
}

impl PyramidGeometry {
    /// Builds the geometry, deriving `max_level` from the image size when not given
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        tile_overlap: u32,
        min_level: Option<u32>,
        max_level: Option<u32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ViewerError::InvalidGeometry(format!(
                "image size must be positive, got {}x{}",
                width, height
            )));
        }
        if tile_size == 0 {
            return Err(ViewerError::InvalidGeometry(
                "tile size must be positive".to_string(),
            ));
        }

        let min_level = min_level.unwrap_or(0);
        let max_level = max_level.unwrap_or_else(|| default_max_level(width, height));
        if min_level > max_level {
            return Err(ViewerError::InvalidGeometry(format!(
                "min level {} exceeds max level {}",
                min_level, max_level
            )));
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tile_overlap,
            min_level,
            max_level,
        })
    }

    pub fn dimensions(&self) -> Point {
        Point::new(self.width as f64, self.height as f64)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// `2^(level - max_level)`
    pub fn level_scale(&self, level: u32) -> f64 {
        2f64.powi(level as i32 - self.max_level as i32)
    }

    pub fn num_tiles(&self, level: u32) -> GridSize {
        let scale = self.level_scale(level);
        let tile_size = self.tile_size as f64;
        GridSize::new(
            (scale * self.width as f64 / tile_size).ceil() as i64,
            (scale * self.height as f64 / tile_size).ceil() as i64,
        )
    }

    /// Normalized size of one source pixel at `level`
    pub fn pixel_ratio(&self, level: u32) -> Point {
        let scaled = self.dimensions().multiply(self.level_scale(level));
        Point::new(1.0 / scaled.x, 1.0 / scaled.y)
    }

    /// Tile containing a normalized content point
    pub fn tile_at_point(&self, level: u32, point: Point) -> (i64, i64) {
        let pixel = point
            .multiply(self.width as f64)
            .multiply(self.level_scale(level));
        let tile_size = self.tile_size as f64;
        (
            (pixel.x / tile_size).floor() as i64,
            (pixel.y / tile_size).floor() as i64,
        )
    }

    /// Normalized bounds of a tile, including its overlap border
    pub fn tile_bounds(&self, level: u32, x: i64, y: i64) -> Rect {
        let scaled = self.dimensions().multiply(self.level_scale(level));
        let tile_size = self.tile_size as f64;
        let overlap = self.tile_overlap as f64;

        let px = if x == 0 { 0.0 } else { tile_size * x as f64 - overlap };
        let py = if y == 0 { 0.0 } else { tile_size * y as f64 - overlap };
        let sx = tile_size + if x == 0 { 1.0 } else { 2.0 } * overlap;
        let sy = tile_size + if y == 0 { 1.0 } else { 2.0 } * overlap;
        let sx = sx.min(scaled.x - px);
        let sy = sy.min(scaled.y - py);

        let scale = 1.0 / scaled.x;
        Rect::new(px * scale, py * scale, sx * scale, sy * scale)
    }

    pub fn tile_exists(&self, level: u32, x: i64, y: i64) -> bool {
        let num_tiles = self.num_tiles(level);
        level >= self.min_level
            && level <= self.max_level
            && x >= 0
            && y >= 0
            && x < num_tiles.x
            && y < num_tiles.y
    }
}

fn default_max_level(width: u32, height: u32) -> u32 {
    (width.max(height) as f64).log2().ceil() as u32
}

/// A pyramid laid out as `{tiles_url}{level}/{x}_{y}.{format}`, optionally
/// restricted to display rects per level
#[derive(Debug, Clone, PartialEq)]
pub struct DziTileSource {
    geometry: PyramidGeometry,
    tiles_url: String,
    format: String,
    display_rects: Vec<DisplayRect>,
    level_rects: HashMap<u32, Vec<DisplayRect>>,
}

impl DziTileSource {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        tile_overlap: u32,
        tiles_url: impl Into<String>,
        format: impl Into<String>,
        display_rects: Vec<DisplayRect>,
    ) -> Result<Self> {
        let format = format.into();
        if !image_format_supported(&format) {
            return Err(ViewerError::UnsupportedFormat(format.to_uppercase()));
        }
        let geometry = PyramidGeometry::new(width, height, tile_size, tile_overlap, None, None)?;

        let mut level_rects: HashMap<u32, Vec<DisplayRect>> = HashMap::default();
        for rect in display_rects.iter().rev() {
            for level in rect.min_level..=rect.max_level {
                level_rects.entry(level).or_default().push(*rect);
            }
        }

        Ok(Self {
            geometry,
            tiles_url: tiles_url.into(),
            format,
            display_rects,
            level_rects,
        })
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        &self.geometry
    }

    pub fn tiles_url(&self) -> &str {
        &self.tiles_url
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn display_rects(&self) -> &[DisplayRect] {
        &self.display_rects
    }

    pub fn tile_url(&self, level: u32, x: i64, y: i64) -> String {
        format!("{}{}/{}_{}.{}", self.tiles_url, level, x, y, self.format)
    }

    /// A tile exists when it is on the grid and, if the level has display
    /// rects, falls inside one of them
    pub fn tile_exists(&self, level: u32, x: i64, y: i64) -> bool {
        if !self.geometry.tile_exists(level, x, y) {
            return false;
        }
        let rects = match self.level_rects.get(&level) {
            Some(rects) if !rects.is_empty() => rects,
            _ => return true,
        };

        let scale = self.geometry.level_scale(level);
        let tile_size = self.geometry.tile_size as f64;
        rects.iter().filter(|r| r.covers_level(level)).any(|r| {
            let x_min = r.rect.x * scale;
            let y_min = r.rect.y * scale;
            let x_max = ((x_min + r.rect.width * scale) / tile_size).ceil() as i64;
            let y_max = ((y_min + r.rect.height * scale) / tile_size).ceil() as i64;
            let x_min = (x_min / tile_size).floor() as i64;
            let y_min = (y_min / tile_size).floor() as i64;

            x_min <= x && x < x_max && y_min <= y && y < y_max
        })
    }
}

/// Whether a DZI image format can be displayed (case-insensitive)
pub fn image_format_supported(format: &str) -> bool {
    let format = format.to_ascii_lowercase();
    DZI_FORMATS
        .iter()
        .any(|(name, supported)| *name == format && *supported)
}

/// Derives the tiles directory from a descriptor URL:
/// `http://host/images/photo.dzi` becomes `http://host/images/photo_files/`
pub fn tiles_url_for_descriptor(descriptor_url: &str) -> String {
    let (dir, file) = match descriptor_url.rfind('/') {
        Some(i) => descriptor_url.split_at(i + 1),
        None => ("", descriptor_url),
    };
    let stem = match file.rfind('.') {
        Some(i) => &file[..i],
        None => file,
    };
    format!("{}{}_files/", dir, stem)
}

/// Maps `(level, x, y)` to a tile URL
pub type TileUrlFn = Arc<dyn Fn(u32, i64, i64) -> String + Send + Sync>;

/// Standard pyramid geometry with a caller supplied URL scheme
#[derive(Clone)]
pub struct CustomTileSource {
    geometry: PyramidGeometry,
    url_fn: TileUrlFn,
}

impl CustomTileSource {
    pub fn new(geometry: PyramidGeometry, url_fn: TileUrlFn) -> Self {
        Self { geometry, url_fn }
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        &self.geometry
    }

    pub fn tile_url(&self, level: u32, x: i64, y: i64) -> String {
        (self.url_fn)(level, x, y)
    }
}

impl fmt::Debug for CustomTileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTileSource")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

/// The tile pyramids the drawer knows how to read
#[derive(Debug, Clone)]
pub enum TileSource {
    Dzi(DziTileSource),
    Legacy(LegacyTileSource),
    Custom(CustomTileSource),
}

impl TileSource {
    pub fn dzi(
        width: u32,
        height: u32,
        tile_size: u32,
        tile_overlap: u32,
        tiles_url: impl Into<String>,
        format: impl Into<String>,
    ) -> Result<Self> {
        DziTileSource::new(
            width,
            height,
            tile_size,
            tile_overlap,
            tiles_url,
            format,
            Vec::new(),
        )
        .map(Self::Dzi)
    }

    pub fn custom(
        geometry: PyramidGeometry,
        url_fn: impl Fn(u32, i64, i64) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomTileSource::new(geometry, Arc::new(url_fn)))
    }

    pub fn geometry(&self) -> &PyramidGeometry {
        match self {
            Self::Dzi(source) => source.geometry(),
            Self::Legacy(source) => source.geometry(),
            Self::Custom(source) => source.geometry(),
        }
    }

    pub fn dimensions(&self) -> Point {
        self.geometry().dimensions()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.geometry().aspect_ratio()
    }

    pub fn tile_size(&self) -> u32 {
        self.geometry().tile_size
    }

    pub fn tile_overlap(&self) -> u32 {
        self.geometry().tile_overlap
    }

    pub fn min_level(&self) -> u32 {
        self.geometry().min_level
    }

    pub fn max_level(&self) -> u32 {
        self.geometry().max_level
    }

    pub fn level_scale(&self, level: u32) -> f64 {
        match self {
            Self::Legacy(source) => source.level_scale(level),
            _ => self.geometry().level_scale(level),
        }
    }

    pub fn num_tiles(&self, level: u32) -> GridSize {
        match self {
            Self::Legacy(source) => source.num_tiles(level),
            _ => self.geometry().num_tiles(level),
        }
    }

    pub fn pixel_ratio(&self, level: u32) -> Point {
        match self {
            Self::Legacy(source) => source.pixel_ratio(level),
            _ => self.geometry().pixel_ratio(level),
        }
    }

    pub fn tile_at_point(&self, level: u32, point: Point) -> (i64, i64) {
        match self {
            Self::Legacy(_) => (0, 0),
            _ => self.geometry().tile_at_point(level, point),
        }
    }

    pub fn tile_bounds(&self, level: u32, x: i64, y: i64) -> Rect {
        match self {
            Self::Legacy(source) => source.tile_bounds(level, x, y),
            _ => self.geometry().tile_bounds(level, x, y),
        }
    }

    pub fn tile_url(&self, level: u32, x: i64, y: i64) -> String {
        match self {
            Self::Dzi(source) => source.tile_url(level, x, y),
            Self::Legacy(source) => source.tile_url(level, x, y),
            Self::Custom(source) => source.tile_url(level, x, y),
        }
    }

    pub fn tile_exists(&self, level: u32, x: i64, y: i64) -> bool {
        match self {
            Self::Dzi(source) => source.tile_exists(level, x, y),
            Self::Legacy(source) => source.tile_exists(level, x, y),
            Self::Custom(source) => source.geometry().tile_exists(level, x, y),
        }
    }
}

impl From<DziTileSource> for TileSource {
    fn from(source: DziTileSource) -> Self {
        Self::Dzi(source)
    }
}

impl From<LegacyTileSource> for TileSource {
    fn from(source: LegacyTileSource) -> Self {
        Self::Legacy(source)
    }
}

impl From<CustomTileSource> for TileSource {
    fn from(source: CustomTileSource) -> Self {
        Self::Custom(source)
    }
}
