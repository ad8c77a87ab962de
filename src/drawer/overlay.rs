//! Elements pinned to the content that follow the view.

use crate::core::geo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Which part of an overlay sits on its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPlacement {
    Center,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl OverlayPlacement {
    /// Moves a top-left `position` so the placement's reference point lands
    /// where the top-left corner was
    pub fn adjust(&self, position: Point, size: Point) -> Point {
        let (dx, dy) = match self {
            Self::TopLeft => (0.0, 0.0),
            Self::Top => (size.x / 2.0, 0.0),
            Self::TopRight => (size.x, 0.0),
            Self::Right => (size.x, size.y / 2.0),
            Self::BottomRight => (size.x, size.y),
            Self::Bottom => (size.x / 2.0, size.y),
            Self::BottomLeft => (0.0, size.y),
            Self::Left => (0.0, size.y / 2.0),
            Self::Center => (size.x / 2.0, size.y / 2.0),
        };
        Point::new(position.x - dx, position.y - dy)
    }
}

impl Default for OverlayPlacement {
    fn default() -> Self {
        Self::Center
    }
}

/// Where an overlay is anchored, in normalized content coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayLocation {
    /// A fixed-size element anchored at a point
    Point(Point),
    /// An element stretched over a region, scaling with zoom
    Rect(Rect),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: String,
    pub location: OverlayLocation,
    #[serde(default)]
    pub placement: OverlayPlacement,
}

impl Overlay {
    pub fn at_point(id: impl Into<String>, point: Point, placement: OverlayPlacement) -> Self {
        Self {
            id: id.into(),
            location: OverlayLocation::Point(point),
            placement,
        }
    }

    pub fn over_rect(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            location: OverlayLocation::Rect(rect),
            placement: OverlayPlacement::TopLeft,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self.location {
            OverlayLocation::Point(point) => Rect::new(point.x, point.y, 0.0, 0.0),
            OverlayLocation::Rect(rect) => rect,
        }
    }

    /// Region overlays grow and shrink with the zoom
    pub fn scales(&self) -> bool {
        matches!(self.location, OverlayLocation::Rect(_))
    }

    /// Region overlays are always laid out from their top-left corner
    pub fn effective_placement(&self) -> OverlayPlacement {
        if self.scales() {
            OverlayPlacement::TopLeft
        } else {
            self.placement
        }
    }

    /// Whole-pixel position and size given the anchor's pixel position and
    /// the element's size
    pub fn layout(&self, anchor: Point, size: Point) -> (Point, Point) {
        let position = self.effective_placement().adjust(anchor, size);
        (position.floor(), size.ceil())
    }
}
