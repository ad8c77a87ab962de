use crate::core::geo::Point;
use crate::prelude::HashMap;

/// How a surface composites tiles, fixed when the drawer is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Tiles are placed as elements at whole-pixel positions and sizes
    Positioned,
    /// Tiles are raster-drawn with fractional destination rects
    Immediate,
}

/// The target a drawer composites onto
pub trait Surface<I> {
    fn mode(&self) -> SurfaceMode;

    /// Starts a new frame for a container of `size` pixels
    fn clear(&mut self, size: Point);

    fn draw_tile(&mut self, image: &I, position: Point, size: Point, opacity: f64);

    /// Positions an overlay element. `scales` is true when `size` follows the
    /// zoom rather than being the element's natural size.
    fn place_overlay(&mut self, id: &str, position: Point, size: Point, scales: bool);

    /// Natural pixel size of an overlay element that does not scale
    fn overlay_size(&self, _id: &str) -> Option<Point> {
        None
    }
}

/// Commands recorded by a [`RenderContext`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand<I> {
    Tile {
        image: I,
        position: Point,
        size: Point,
        opacity: f64,
    },
    Overlay {
        id: String,
        position: Point,
        size: Point,
        scales: bool,
    },
}

/// A surface that records what was drawn during the last frame, for hosts
/// that replay the queue on their own renderer and for tests
#[derive(Debug, Clone)]
pub struct RenderContext<I> {
    pub mode: SurfaceMode,
    /// Container size passed to the last `clear`
    pub size: Point,
    pub drawing_queue: Vec<DrawCommand<I>>,
    /// Number of frames started
    pub frames: usize,
    overlay_sizes: HashMap<String, Point>,
}

impl<I> RenderContext<I> {
    pub fn new(mode: SurfaceMode) -> Self {
        Self {
            mode,
            size: Point::default(),
            drawing_queue: Vec::new(),
            frames: 0,
            overlay_sizes: HashMap::default(),
        }
    }

    pub fn positioned() -> Self {
        Self::new(SurfaceMode::Positioned)
    }

    pub fn immediate() -> Self {
        Self::new(SurfaceMode::Immediate)
    }

    /// Reports the natural size of an overlay element, as the host measured it
    pub fn set_overlay_size(&mut self, id: impl Into<String>, size: Point) {
        self.overlay_sizes.insert(id.into(), size);
    }

    pub fn get_drawing_queue(&self) -> &[DrawCommand<I>] {
        &self.drawing_queue
    }

    /// Tiles drawn in the last frame, in drawing order
    pub fn tiles(&self) -> impl Iterator<Item = (&I, Point, Point, f64)> {
        self.drawing_queue.iter().filter_map(|command| match command {
            DrawCommand::Tile {
                image,
                position,
                size,
                opacity,
            } => Some((image, *position, *size, *opacity)),
            DrawCommand::Overlay { .. } => None,
        })
    }

    /// Position and size an overlay was placed at in the last frame
    pub fn overlay(&self, id: &str) -> Option<(Point, Point)> {
        self.drawing_queue.iter().find_map(|command| match command {
            DrawCommand::Overlay {
                id: placed,
                position,
                size,
                ..
            } if placed == id => Some((*position, *size)),
            _ => None,
        })
    }

    pub fn clear_queue(&mut self) {
        self.drawing_queue.clear();
    }
}

impl<I: Clone> Surface<I> for RenderContext<I> {
    fn mode(&self) -> SurfaceMode {
        self.mode
    }

    fn clear(&mut self, size: Point) {
        self.drawing_queue.clear();
        self.size = size;
        self.frames += 1;
    }

    fn draw_tile(&mut self, image: &I, position: Point, size: Point, opacity: f64) {
        self.drawing_queue.push(DrawCommand::Tile {
            image: image.clone(),
            position,
            size,
            opacity,
        });
    }

    fn place_overlay(&mut self, id: &str, position: Point, size: Point, scales: bool) {
        self.drawing_queue.push(DrawCommand::Overlay {
            id: id.to_string(),
            position,
            size,
            scales,
        });
    }

    fn overlay_size(&self, id: &str) -> Option<Point> {
        self.overlay_sizes.get(id).copied()
    }
}
