//! # riskzone
//!
//! Risk-zone map rendering on top of a from-scratch slippy-map compositor.
//!
//! The crate projects a geographic center onto the Web-Mercator tile plane,
//! fetches the raster tiles covering a fixed-size surface, composites them so
//! the center lands on the surface midpoint, and overlays a disc of fixed
//! real-world radius plus a center marker. Thin clients for the ZIP geocoding
//! API and the prediction backend feed it its inputs.

pub mod core;
pub mod rendering;
pub mod services;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{RiskMapConfig, RiskMapProfile},
    geo::{project, to_screen, unproject, GeoPoint, ScreenPoint, TileCoordinate, TileIndex},
    map::{RenderHandle, RenderPhase, RiskZoneMap},
    viewport::{TileGrid, Viewport},
};

pub use rendering::{
    compositor::{RenderReport, TileCompositor},
    overlay::Overlay,
    surface::{DrawSurface, SharedSurface},
};

pub use services::{
    cities::{distinct_cities, merge_city_lists, CityEntry},
    geocode::{normalize_zip, Geocoder, Location, ZippopotamGeocoder},
    prediction::{
        HttpPredictionService, Prediction, PredictionOutcome, PredictionRequest, PredictionService,
        RiskCategory,
    },
    report::RiskReport,
};

pub use tiles::{
    barrier::{SettleBarrier, SettleTicket},
    loader::{HttpTileFetcher, TileFetcher},
    source::{TemplateSource, TileSource},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs the `env_logger` backend, honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
