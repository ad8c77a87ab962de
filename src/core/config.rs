//! Configuration for the viewer and its components
//!
//! Every component receives its own explicit settings struct. [`ViewerOptions`]
//! bundles them, can be deserialized from JSON with missing fields falling back
//! to defaults, and presets are available through [`ViewerProfile`].

use crate::core::constants::*;
use crate::{Result, ViewerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerProfile {
    Balanced,
    LowMemory,
    HighQuality,
    Custom(ViewerOptions),
}

impl ViewerProfile {
    pub fn resolve(&self) -> ViewerOptions {
        match self {
            Self::Balanced => ViewerOptions::default(),
            Self::LowMemory => ViewerOptions {
                drawer: DrawerConfig {
                    max_image_cache_count: 32,
                    blend_time: 0.0,
                    min_pixel_ratio: 0.9,
                    ..DrawerConfig::default()
                },
                loader: LoaderConfig::low_resource(),
                ..ViewerOptions::default()
            },
            Self::HighQuality => ViewerOptions {
                viewport: ViewportConfig {
                    max_zoom_pixel_ratio: 4.0,
                    ..ViewportConfig::default()
                },
                drawer: DrawerConfig {
                    max_image_cache_count: 400,
                    min_pixel_ratio: 0.25,
                    always_blend: true,
                    ..DrawerConfig::default()
                },
                loader: LoaderConfig::high_performance(),
                ..ViewerOptions::default()
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for ViewerProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub viewport: ViewportConfig,
    pub drawer: DrawerConfig,
    pub navigation: NavigationConfig,
    pub loader: LoaderConfig,
}

impl ViewerOptions {
    /// Parses options from JSON and validates them
    pub fn from_json(json: &str) -> Result<Self> {
        let options: ViewerOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Enables or disables wrapping. Drawers follow the viewport's setting.
    pub fn with_wrap(mut self, horizontal: bool, vertical: bool) -> Self {
        self.viewport.wrap_horizontal = horizontal;
        self.viewport.wrap_vertical = vertical;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.viewport.validate()?;
        self.drawer.validate()?;
        self.navigation.validate()?;
        self.loader.validate()
    }
}

fn invalid(message: impl Into<String>) -> ViewerError {
    ViewerError::InvalidConfig(message.into())
}

/// Viewport settings. The drawers read the wrap axes and
/// `min_zoom_image_ratio` from here too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub spring_stiffness: f64,
    /// Seconds
    pub animation_time: f64,
    pub min_zoom_image_ratio: f64,
    pub max_zoom_pixel_ratio: f64,
    pub visibility_ratio: f64,
    pub wrap_horizontal: bool,
    pub wrap_vertical: bool,
}

impl ViewportConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.spring_stiffness > 0.0) {
            return Err(invalid("spring_stiffness must be positive"));
        }
        if !(self.animation_time >= 0.0) {
            return Err(invalid("animation_time must not be negative"));
        }
        if !(self.min_zoom_image_ratio > 0.0) {
            return Err(invalid("min_zoom_image_ratio must be positive"));
        }
        if !(self.max_zoom_pixel_ratio > 0.0) {
            return Err(invalid("max_zoom_pixel_ratio must be positive"));
        }
        if !(0.0..=1.0).contains(&self.visibility_ratio) {
            return Err(invalid("visibility_ratio must be within [0, 1]"));
        }
        Ok(())
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            spring_stiffness: DEFAULT_SPRING_STIFFNESS,
            animation_time: DEFAULT_ANIMATION_TIME,
            min_zoom_image_ratio: DEFAULT_MIN_ZOOM_IMAGE_RATIO,
            max_zoom_pixel_ratio: DEFAULT_MAX_ZOOM_PIXEL_RATIO,
            visibility_ratio: DEFAULT_VISIBILITY_RATIO,
            wrap_horizontal: DEFAULT_WRAP_HORIZONTAL,
            wrap_vertical: DEFAULT_WRAP_VERTICAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerConfig {
    /// Seconds
    pub blend_time: f64,
    pub always_blend: bool,
    pub immediate_render: bool,
    pub min_pixel_ratio: f64,
    pub max_image_cache_count: usize,
}

impl DrawerConfig {
    pub fn blend_time_ms(&self) -> f64 {
        1000.0 * self.blend_time
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.blend_time >= 0.0) {
            return Err(invalid("blend_time must not be negative"));
        }
        if !(self.min_pixel_ratio > 0.0) {
            return Err(invalid("min_pixel_ratio must be positive"));
        }
        if self.max_image_cache_count == 0 {
            return Err(invalid("max_image_cache_count must be at least 1"));
        }
        Ok(())
    }
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            blend_time: DEFAULT_BLEND_TIME,
            always_blend: DEFAULT_ALWAYS_BLEND,
            immediate_render: DEFAULT_IMMEDIATE_RENDER,
            min_pixel_ratio: DEFAULT_MIN_PIXEL_RATIO,
            max_image_cache_count: DEFAULT_MAX_IMAGE_CACHE_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub zoom_per_click: f64,
    pub zoom_per_scroll: f64,
    pub zoom_per_second: f64,
    /// Milliseconds
    pub click_time_threshold: u64,
    /// Pixels
    pub click_dist_threshold: f64,
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("zoom_per_click", self.zoom_per_click),
            ("zoom_per_scroll", self.zoom_per_scroll),
            ("zoom_per_second", self.zoom_per_second),
        ] {
            if !(value > 0.0) {
                return Err(invalid(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            zoom_per_click: DEFAULT_ZOOM_PER_CLICK,
            zoom_per_scroll: DEFAULT_ZOOM_PER_SCROLL,
            zoom_per_second: DEFAULT_ZOOM_PER_SECOND,
            click_time_threshold: DEFAULT_CLICK_TIME_THRESHOLD,
            click_dist_threshold: DEFAULT_CLICK_DIST_THRESHOLD,
        }
    }
}

/// Settings shared by the image loaders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum outstanding loads, 0 for no cap
    pub image_loader_limit: usize,
    pub timeout_ms: u64,
}

impl LoaderConfig {
    pub fn low_resource() -> Self {
        Self {
            image_loader_limit: 2,
            timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
        }
    }

    pub fn high_performance() -> Self {
        Self {
            image_loader_limit: 0,
            timeout_ms: 10_000,
        }
    }

    /// Whether another load may start with `downloading` already outstanding
    pub fn has_capacity(&self, downloading: usize) -> bool {
        self.image_loader_limit == 0 || downloading < self.image_loader_limit
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be positive"));
        }
        Ok(())
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            image_loader_limit: DEFAULT_IMAGE_LOADER_LIMIT,
            timeout_ms: DEFAULT_IMAGE_TIMEOUT_MS,
        }
    }
}
