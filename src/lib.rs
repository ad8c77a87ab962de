//! # deepzoom
//!
//! A deep-zoom image viewer core: pan and zoom smoothly over a pyramidal
//! tiled image while loading only the tiles the current view needs.
//!
//! The [`Viewport`] maps normalized content coordinates to container pixels
//! and animates pan and zoom with springs. A [`Drawer`] picks the pyramid
//! levels and tiles for the view, schedules image loads through an
//! [`ImageLoader`], keeps a bounded pool of decoded tiles, blends new tiles
//! in, and draws onto a [`Surface`]. The [`Viewer`] runs the frame loop and
//! turns navigation input into viewport motion.
//!
//! Rendering, image decoding and network fetching belong to the host.

pub mod animation;
pub mod core;
pub mod drawer;
pub mod input;
pub mod prelude;
pub mod rendering;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{
        DrawerConfig, LoaderConfig, NavigationConfig, ViewerOptions, ViewerProfile,
        ViewportConfig,
    },
    geo::{DisplayRect, Point, Rect},
    viewer::Viewer,
    viewport::Viewport,
};

pub use animation::{
    clock::{Clock, ManualClock, SharedClock, SystemClock},
    spring::Spring,
};

pub use drawer::{Drawer, Overlay, OverlayLocation, OverlayPlacement};

pub use input::events::{EventHandled, InputEvent, ViewerEvent};

pub use rendering::surface::{DrawCommand, RenderContext, Surface, SurfaceMode};

pub use tiles::{
    legacy::{LegacyLevel, LegacyTileSource},
    loader::{
        DeferredImageLoader, ImageFetcher, ImageLoader, ImageRequest, ImageResponse,
        ThreadedImageLoader,
    },
    source::{DziTileSource, PyramidGeometry, TileSource},
    tile::{Tile, TileKey},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No image is open")]
    NotOpen,

    #[error("Load error: {0}")]
    Load(String),
}

/// Error type alias for convenience
pub type Error = ViewerError;
