pub mod surface;

pub use surface::{DrawCommand, RenderContext, Surface, SurfaceMode};
