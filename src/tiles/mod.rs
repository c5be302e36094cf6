pub mod barrier;
pub mod loader;
pub mod source;

// Re-exports for convenience
pub use barrier::{SettleBarrier, SettleTicket};
pub use loader::{HttpTileFetcher, TileFetcher};
pub use source::{TemplateSource, TileSource};
