//! Per-frame tile selection, loading and compositing for one image.
//!
//! Each [`Drawer::update`] walks the pyramid from the sharpest useful level
//! down to the coarsest, draws every loaded tile that is not hidden beneath
//! opaque finer tiles, and asks the loader for the single most useful missing
//! tile. Frames keep coming while tiles are blending in or still missing.

pub mod cache;
pub mod coverage;
pub mod overlay;

pub use cache::TileCache;
pub use coverage::Coverage;
pub use overlay::{Overlay, OverlayLocation, OverlayPlacement};

use crate::animation::clock::SharedClock;
use crate::core::config::DrawerConfig;
use crate::core::geo::Point;
use crate::core::viewport::Viewport;
use crate::rendering::surface::{Surface, SurfaceMode};
use crate::tiles::loader::{ImageLoader, ImageRequest, ImageResponse};
use crate::tiles::source::{GridSize, TileSource};
use crate::tiles::tile::{Tile, TileKey};

/// Settings of one level during a frame
#[derive(Debug, Clone, Copy)]
struct LevelPass {
    level: u32,
    /// Draw every tile of this level, covered or not
    draw_level: bool,
    opacity: f64,
    visibility: f64,
}

/// The most useful missing tile seen so far this frame
#[derive(Debug, Clone, Copy)]
struct Candidate {
    key: TileKey,
    visibility: f64,
    distance: f64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.visibility > other.visibility
            || (self.visibility == other.visibility && self.distance < other.distance)
    }
}

/// Draws one tiled image through a viewport onto a surface
pub struct Drawer<L: ImageLoader, S> {
    source: TileSource,
    config: DrawerConfig,
    loader: L,
    surface: S,
    clock: SharedClock,
    mode: SurfaceMode,

    cache: TileCache<L::Image>,
    coverage: Coverage,
    overlays: Vec<Overlay>,
    /// Tiles drawn in the last frame, finest level first
    last_drawn: Vec<TileKey>,

    norm_height: f64,
    /// Tiles at or below this level are never evicted
    cutoff_level: u32,
    last_reset_time: f64,
    mid_update: bool,
    update_again: bool,
}

impl<L, S> Drawer<L, S>
where
    L: ImageLoader,
    S: Surface<L::Image>,
{
    pub fn new(
        source: TileSource,
        config: DrawerConfig,
        loader: L,
        surface: S,
        clock: SharedClock,
    ) -> Self {
        let mode = surface.mode();
        let dimensions = source.dimensions();
        let cutoff_level = (source.tile_size() as f64).log2().ceil() as u32;
        let now = clock.now_millis();

        Self {
            norm_height: dimensions.y / dimensions.x,
            cutoff_level,
            cache: TileCache::new(config.max_image_cache_count),
            coverage: Coverage::new(),
            overlays: Vec::new(),
            last_drawn: Vec::new(),
            last_reset_time: now,
            mid_update: false,
            update_again: true,
            source,
            config,
            loader,
            surface,
            clock,
            mode,
        }
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    pub fn config(&self) -> &DrawerConfig {
        &self.config
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn tile(&self, key: &TileKey) -> Option<&Tile<L::Image>> {
        self.cache.get(key)
    }

    pub fn cache(&self) -> &TileCache<L::Image> {
        &self.cache
    }

    pub fn num_tiles_loaded(&self) -> usize {
        self.cache.loaded_count()
    }

    /// Tiles composited in the last frame, in drawing order
    pub fn last_drawn(&self) -> impl Iterator<Item = &TileKey> {
        self.last_drawn.iter().rev()
    }

    /// Whether another frame is needed to finish blending or loading
    pub fn needs_update(&self) -> bool {
        self.update_again
    }

    /// Forgets every tile, e.g. after the source changed. Loads still in
    /// flight are ignored when they complete.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.coverage.clear();
        self.last_drawn.clear();
        self.last_reset_time = self.clock.now_millis();
        self.update_again = true;
    }

    /// Applies every finished load reported by the loader
    pub fn process_loads(&mut self) {
        let now = self.clock.now_millis();
        for response in self.loader.poll_completed(now) {
            self.on_tile_load(response);
        }
    }

    pub fn on_tile_load(&mut self, response: ImageResponse<L::Image>) {
        let key = response.key;
        if response.issued_at < self.last_reset_time {
            log::debug!("ignoring tile {} requested before the last reset", key);
            return;
        }
        let tile = match self.cache.get_mut(&key) {
            Some(tile) => tile,
            None => {
                log::debug!("ignoring load of unknown tile {}", key);
                return;
            }
        };

        tile.loading = false;
        if self.mid_update {
            log::warn!("tile {} finished loading while a frame was being drawn", key);
            return;
        }
        if tile.loaded {
            return;
        }

        match response.image {
            Some(image) => tile.mark_loaded(image),
            None => {
                log::debug!("tile {} failed to load from {}", key, response.url);
                tile.exists = false;
                return;
            }
        }

        self.cache.insert_loaded(key, self.cutoff_level);
        self.update_again = true;
    }

    /// Draws a frame for the viewport's current state
    pub fn update(&mut self, viewport: &Viewport) {
        self.process_loads();
        self.mid_update = true;
        self.update_actual(viewport);
        self.mid_update = false;
    }

    fn update_actual(&mut self, viewport: &Viewport) {
        self.update_again = false;

        for key in self.last_drawn.drain(..) {
            if let Some(tile) = self.cache.get_mut(&key) {
                tile.being_drawn = false;
            }
        }
        self.surface.clear(viewport.container_size());

        let wrap_horizontal = viewport.config().wrap_horizontal;
        let wrap_vertical = viewport.config().wrap_vertical;
        let bounds = viewport.bounds(true);
        let mut top_left = bounds.top_left();
        let mut bottom_right = bounds.bottom_right();

        if !wrap_horizontal && (bottom_right.x < 0.0 || top_left.x > 1.0) {
            return;
        }
        if !wrap_vertical && (bottom_right.y < 0.0 || top_left.y > self.norm_height) {
            return;
        }
        if !wrap_horizontal {
            top_left.x = top_left.x.max(0.0);
            bottom_right.x = bottom_right.x.min(1.0);
        }
        if !wrap_vertical {
            top_left.y = top_left.y.max(0.0);
            bottom_right.y = bottom_right.y.min(self.norm_height);
        }

        let now = self.clock.now_millis();
        let viewport_center = viewport.pixel_from_point(viewport.center(false), false);

        let zero_ratio_c = self.render_pixel_ratio(viewport, 0, true);
        let zero_ratio_t = self.render_pixel_ratio(viewport, 0, false);
        let optimal_ratio = if self.config.immediate_render {
            1.0
        } else {
            zero_ratio_t
        };
        let (lowest, highest) =
            self.level_range(viewport.config().min_zoom_image_ratio, zero_ratio_c);

        let mut have_drawn = false;
        let mut best: Option<Candidate> = None;

        for level in (lowest..=highest).rev() {
            let ratio_c = self.render_pixel_ratio(viewport, level, true);

            let draw_level = if (!have_drawn && ratio_c >= self.config.min_pixel_ratio)
                || level == lowest
            {
                have_drawn = true;
                true
            } else if !have_drawn {
                continue;
            } else {
                false
            };

            let ratio_t = self.render_pixel_ratio(viewport, level, false);
            let pass = LevelPass {
                level,
                draw_level,
                opacity: ((ratio_c - 0.5) / 0.5).clamp(0.0, 1.0),
                visibility: optimal_ratio / (optimal_ratio - ratio_t).abs(),
            };

            self.update_level(
                viewport,
                pass,
                top_left,
                bottom_right,
                viewport_center,
                now,
                &mut best,
            );

            // nothing below a fully opaque level can show
            if self.coverage.provides_coverage(level) {
                break;
            }
        }

        self.draw_tiles();
        self.draw_overlays(viewport);

        if let Some(candidate) = best {
            self.load_tile(candidate.key, now);
            self.update_again = true;
        }
    }

    /// Screen pixels per source pixel at `level`
    fn render_pixel_ratio(&self, viewport: &Viewport, level: u32, current: bool) -> f64 {
        viewport
            .delta_pixels_from_points(self.source.pixel_ratio(level), current)
            .x
    }

    /// Inclusive range of levels worth considering, coarsest first
    fn level_range(&self, min_zoom_image_ratio: f64, zero_ratio_c: f64) -> (u32, u32) {
        let min_level = self.source.min_level() as i64;
        let max_level = self.source.max_level() as i64;

        let lowest = min_level.max(min_zoom_image_ratio.log2().floor() as i64);
        let highest = max_level
            .min((zero_ratio_c / self.config.min_pixel_ratio).log2().floor() as i64)
            .max(min_level);
        let lowest = lowest.min(highest);

        (lowest as u32, highest as u32)
    }

    #[allow(clippy::too_many_arguments)]
    fn update_level(
        &mut self,
        viewport: &Viewport,
        pass: LevelPass,
        top_left: Point,
        bottom_right: Point,
        viewport_center: Point,
        now: f64,
        best: &mut Option<Candidate>,
    ) {
        let level = pass.level;
        let num_tiles = self.source.num_tiles(level);
        if num_tiles.x <= 0 || num_tiles.y <= 0 {
            return;
        }

        let (tl_x, tl_y) = self.source.tile_at_point(level, top_left);
        let (mut br_x, mut br_y) = self.source.tile_at_point(level, bottom_right);
        if !viewport.config().wrap_horizontal {
            br_x = br_x.min(num_tiles.x - 1);
        }
        if !viewport.config().wrap_vertical {
            br_y = br_y.min(num_tiles.y - 1);
        }

        self.coverage.reset(level);

        for x in tl_x..=br_x {
            for y in tl_y..=br_y {
                let candidate =
                    self.update_tile(viewport, pass, x, y, num_tiles, viewport_center, now);
                if let Some(candidate) = candidate {
                    if best.map_or(true, |current| candidate.beats(&current)) {
                        *best = Some(candidate);
                    }
                }
            }
        }
    }

    /// Positions, blends and records one tile; returns it when it should be
    /// loaded
    #[allow(clippy::too_many_arguments)]
    fn update_tile(
        &mut self,
        viewport: &Viewport,
        pass: LevelPass,
        x: i64,
        y: i64,
        num_tiles: GridSize,
        viewport_center: Point,
        now: f64,
    ) -> Option<Candidate> {
        let level = pass.level;
        let key = TileKey::new(level, x, y);
        let source = &self.source;
        let norm_height = self.norm_height;

        let tile = self
            .cache
            .get_or_insert_with(key, || new_tile(source, norm_height, key, num_tiles));
        tile.last_touch_time = now;

        self.coverage.set(level, x, y, false);
        if !tile.exists {
            return None;
        }
        if !pass.draw_level && self.coverage.is_covered(level, x, y) {
            self.coverage.set(level, x, y, true);
            return None;
        }

        let position = viewport.pixel_from_point(tile.bounds.top_left(), true);
        let mut size = viewport.delta_pixels_from_points(tile.bounds.size(), true);
        let position_t = viewport.pixel_from_point(tile.bounds.top_left(), false);
        let size_t = viewport.delta_pixels_from_points(tile.bounds.size(), false);
        tile.distance = viewport_center.distance_to(&(position_t + size_t / 2.0));
        if source.tile_overlap() == 0 {
            // hides seams between neighbours
            size = size + Point::new(1.0, 1.0);
        }
        tile.position = position;
        tile.size = size;
        tile.visibility = pass.visibility;

        if tile.loaded {
            let blend_ms = self.config.blend_time_ms();
            let blend_start = *tile.blend_start.get_or_insert(now);
            let elapsed = now - blend_start;

            let mut opacity = if blend_ms > 0.0 {
                (elapsed / blend_ms).min(1.0)
            } else {
                1.0
            };
            if self.config.always_blend {
                opacity *= pass.opacity;
            }
            tile.opacity = opacity;
            self.last_drawn.push(key);

            if opacity == 1.0 {
                self.coverage.set(level, x, y, true);
            } else if elapsed < blend_ms {
                self.update_again = true;
            }
            None
        } else if tile.loading {
            None
        } else {
            Some(Candidate {
                key,
                visibility: tile.visibility,
                distance: tile.distance,
            })
        }
    }

    fn draw_tiles(&mut self) {
        // coarse tiles first so finer ones end up on top
        for key in self.last_drawn.iter().rev() {
            let tile = match self.cache.get_mut(key) {
                Some(tile) => tile,
                None => continue,
            };
            tile.being_drawn = true;

            let image = match tile.image.as_ref() {
                Some(image) if tile.loaded => image,
                _ => {
                    log::warn!("attempting to draw tile {} before it is loaded", key);
                    continue;
                }
            };
            let (position, size) = match self.mode {
                SurfaceMode::Positioned => (tile.position.floor(), tile.size.ceil()),
                SurfaceMode::Immediate => (tile.position, tile.size),
            };
            self.surface.draw_tile(image, position, size, tile.opacity);
        }
    }

    fn draw_overlays(&mut self, viewport: &Viewport) {
        for overlay in &self.overlays {
            let bounds = overlay.bounds();
            let anchor = viewport.pixel_from_point(bounds.top_left(), true);
            let size = if overlay.scales() {
                viewport.delta_pixels_from_points(bounds.size(), true)
            } else {
                self.surface.overlay_size(&overlay.id).unwrap_or_default()
            };

            let (position, size) = overlay.layout(anchor, size);
            self.surface
                .place_overlay(&overlay.id, position, size, overlay.scales());
        }
    }

    fn load_tile(&mut self, key: TileKey, now: f64) {
        let tile = match self.cache.get_mut(&key) {
            Some(tile) => tile,
            None => return,
        };
        let request = ImageRequest {
            key,
            url: tile.url.clone(),
            issued_at: now,
        };
        tile.loading = self.loader.load_image(request);
        if tile.loading {
            log::debug!("requested tile {} from {}", key, tile.url);
        }
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Adds an overlay unless one with the same id exists
    pub fn add_overlay(&mut self, overlay: Overlay) -> bool {
        if self.overlays.iter().any(|o| o.id == overlay.id) {
            return false;
        }
        self.overlays.push(overlay);
        self.update_again = true;
        true
    }

    /// Moves an existing overlay
    pub fn update_overlay(
        &mut self,
        id: &str,
        location: OverlayLocation,
        placement: OverlayPlacement,
    ) -> bool {
        match self.overlays.iter_mut().find(|o| o.id == id) {
            Some(overlay) => {
                overlay.location = location;
                overlay.placement = placement;
                self.update_again = true;
                true
            }
            None => false,
        }
    }

    pub fn remove_overlay(&mut self, id: &str) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.id != id);
        let removed = self.overlays.len() != before;
        if removed {
            self.update_again = true;
        }
        removed
    }

    pub fn clear_overlays(&mut self) {
        self.overlays.clear();
        self.update_again = true;
    }
}

/// Builds the tile at `key`, folding wrapped indices back onto the grid for
/// its geometry and URL while keeping its bounds at the wrapped position
fn new_tile<I>(
    source: &TileSource,
    norm_height: f64,
    key: TileKey,
    num_tiles: GridSize,
) -> Tile<I> {
    let x_mod = key.x.rem_euclid(num_tiles.x);
    let y_mod = key.y.rem_euclid(num_tiles.y);

    let mut bounds = source.tile_bounds(key.level, x_mod, y_mod);
    bounds.x += (key.x - x_mod) as f64 / num_tiles.x as f64;
    bounds.y += norm_height * (key.y - y_mod) as f64 / num_tiles.y as f64;

    Tile::new(
        key,
        bounds,
        source.tile_exists(key.level, x_mod, y_mod),
        source.tile_url(key.level, x_mod, y_mod),
    )
}
