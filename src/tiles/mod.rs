pub mod legacy;
pub mod loader;
pub mod source;
pub mod tile;

// Re-exports for convenience
pub use legacy::{LegacyLevel, LegacyTileSource};
pub use loader::{
    DeferredImageLoader, ImageFetcher, ImageLoader, ImageRequest, ImageResponse,
    ThreadedImageLoader,
};
pub use source::{CustomTileSource, DziTileSource, GridSize, PyramidGeometry, TileSource};
pub use tile::{Tile, TileKey};
