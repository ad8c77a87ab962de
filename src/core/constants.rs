//! Engine-wide default settings for the viewport, drawer, loader and navigation.
//! Keeping them in a single place makes it easier to tweak the viewer's magic numbers.

/// Seconds a spring takes to travel from its start value to its target.
pub const DEFAULT_ANIMATION_TIME: f64 = 1.5;

/// Exponential stiffness of the spring ease curve.
pub const DEFAULT_SPRING_STIFFNESS: f64 = 5.0;

/// Seconds a freshly loaded tile takes to fade in.
pub const DEFAULT_BLEND_TIME: f64 = 0.5;

/// Multiply blend opacity by the level's sharpness ramp.
pub const DEFAULT_ALWAYS_BLEND: bool = false;

/// Prefer the level closest to 1:1 over the eventual target sharpness.
pub const DEFAULT_IMMEDIATE_RENDER: bool = false;

pub const DEFAULT_WRAP_HORIZONTAL: bool = false;
pub const DEFAULT_WRAP_VERTICAL: bool = false;

/// Minimum zoom as a fraction of the home zoom.
pub const DEFAULT_MIN_ZOOM_IMAGE_RATIO: f64 = 0.8;

/// Ceiling on source pixels shown per screen pixel.
pub const DEFAULT_MAX_ZOOM_PIXEL_RATIO: f64 = 2.0;

/// Fraction of the viewport that must stay over content.
pub const DEFAULT_VISIBILITY_RATIO: f64 = 0.5;

/// Screen pixels per source pixel below which a level is too blurry to draw.
pub const DEFAULT_MIN_PIXEL_RATIO: f64 = 0.5;

/// Concurrent image loads; 0 means no cap.
pub const DEFAULT_IMAGE_LOADER_LIMIT: usize = 0;

/// Loaded tile images kept before eviction starts.
pub const DEFAULT_MAX_IMAGE_CACHE_COUNT: usize = 100;

/// Milliseconds before an outstanding image load counts as failed.
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 5000;

/// A press shorter than this (ms) counts as a click.
pub const DEFAULT_CLICK_TIME_THRESHOLD: u64 = 200;

/// A press moving less than this (px) counts as a click.
pub const DEFAULT_CLICK_DIST_THRESHOLD: f64 = 5.0;

pub const DEFAULT_ZOOM_PER_CLICK: f64 = 2.0;
pub const DEFAULT_ZOOM_PER_SCROLL: f64 = 1.2;
pub const DEFAULT_ZOOM_PER_SECOND: f64 = 2.0;

/// Idle frame cadence the update loop aims for.
pub const TARGET_UPDATES_PER_SECOND: f64 = 60.0;

/// Delay (ms) between frames while the view is animating.
pub const ANIMATING_FRAME_DELAY_MS: f64 = 1.0;
