pub mod compositor;
pub mod overlay;
pub mod surface;

// Re-export main types
pub use compositor::{RenderReport, TileCompositor};
pub use overlay::Overlay;
pub use surface::{DrawSurface, SharedSurface};
