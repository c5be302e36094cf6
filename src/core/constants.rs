//! Core constants derived from OpenStreetMap tile conventions and the
//! risk-zone map defaults. Keeping them in a single place makes it easier to
//! tweak engine-wide magic numbers.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Equatorial circumference of the Earth in meters.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_017.0;

/// Highest zoom level served by the default tile source.
pub const MAX_ZOOM: u8 = 19;

/// Zoom used when the caller does not pick one.
pub const DEFAULT_ZOOM: u8 = 13;

/// Real-world radius of the risk disc, in meters.
pub const DEFAULT_RADIUS_METERS: f64 = 5_000.0;

/// Default draw surface size (width, height) in pixels.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (800, 600);

/// OpenStreetMap tile URL template.
pub const OSM_TILE_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Public ZIP lookup service.
pub const ZIPPOPOTAM_BASE_URL: &str = "https://api.zippopotam.us";

/// Prediction backend address used in local development.
pub const DEFAULT_PREDICTION_BASE_URL: &str = "http://localhost:5000";

/// Public tile servers reject anonymous clients.
pub const USER_AGENT: &str = concat!("riskzone/", env!("CARGO_PKG_VERSION"));

/// Confidence at or above which a prediction counts as reliable.
pub const GOOD_PREDICTION_CONFIDENCE: f64 = 0.7;
