use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new GeoPoint coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in surface pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest whole pixel, as used for blitting and circle centers
    pub fn round(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Continuous position on the Web-Mercator tile plane at a zoom level.
///
/// The integer part selects the tile, the fractional part the position
/// inside it. Only [`project`] builds these, so a coordinate is never
/// detached from the point it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCoordinate {
    pub x: f64,
    pub y: f64,
    pub zoom: u8,
}

impl TileCoordinate {
    /// Floors the coordinate to the tile that contains it
    pub fn tile_index(&self) -> TileIndex {
        TileIndex::new(self.x.floor() as i64, self.y.floor() as i64, self.zoom)
    }
}

/// Represents a tile address in the slippy map tile system
///
/// Signed so that the one-tile margin around the world edge can be
/// expressed; such tiles simply fail to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i64,
    pub y: i64,
    pub zoom: u8,
}

impl TileIndex {
    pub fn new(x: i64, y: i64, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

/// Spherical Web-Mercator forward transform onto the tile plane.
///
/// Latitude is not clamped: inputs near the poles give extreme `y` values.
pub fn project(point: &GeoPoint, zoom: u8) -> TileCoordinate {
    let n = 2_f64.powi(zoom as i32);
    let lat_rad = point.lat * PI / 180.0;

    let x = (point.lng + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;

    TileCoordinate { x, y, zoom }
}

/// Inverse of [`project`]
pub fn unproject(coord: &TileCoordinate) -> GeoPoint {
    let n = 2_f64.powi(coord.zoom as i32);
    let lng = coord.x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * coord.y / n)).sinh().atan().to_degrees();

    GeoPoint::new(lat, lng)
}

/// Places `point` on a surface whose midpoint shows `center`
pub fn to_screen(
    point: &GeoPoint,
    center: &GeoPoint,
    zoom: u8,
    tile_size_px: f64,
    surface_width: f64,
    surface_height: f64,
) -> ScreenPoint {
    let center_coord = project(center, zoom);
    let point_coord = project(point, zoom);

    ScreenPoint::new(
        (point_coord.x - center_coord.x) * tile_size_px + surface_width / 2.0,
        (point_coord.y - center_coord.y) * tile_size_px + surface_height / 2.0,
    )
}
