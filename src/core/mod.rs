pub mod config;
pub mod constants;
pub mod geo;
pub mod viewer;
pub mod viewport;

pub use config::{
    DrawerConfig, LoaderConfig, NavigationConfig, ViewerOptions, ViewerProfile, ViewportConfig,
};
pub use geo::{DisplayRect, Point, Rect};
pub use viewer::Viewer;
pub use viewport::Viewport;
