//! Prelude module for common deepzoom types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use deepzoom::prelude::*;`

pub use crate::core::{
    config::{
        DrawerConfig, LoaderConfig, NavigationConfig, ViewerOptions, ViewerProfile,
        ViewportConfig,
    },
    geo::{DisplayRect, Point, Rect},
    viewer::Viewer,
    viewport::Viewport,
};

pub use crate::animation::{
    clock::{Clock, ManualClock, SharedClock, SystemClock},
    spring::Spring,
};

pub use crate::drawer::{Drawer, Overlay, OverlayLocation, OverlayPlacement};

pub use crate::input::events::{is_quick_click, EventHandled, InputEvent, ViewerEvent};

pub use crate::rendering::surface::{RenderContext, Surface, SurfaceMode};

pub use crate::tiles::{
    legacy::{LegacyLevel, LegacyTileSource},
    loader::{DeferredImageLoader, ImageFetcher, ImageLoader, ThreadedImageLoader},
    source::{PyramidGeometry, TileSource},
    tile::TileKey,
};

pub use crate::{Error as ViewerError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
