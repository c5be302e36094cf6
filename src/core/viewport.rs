use crate::core::constants::{EARTH_CIRCUMFERENCE_M, TILE_SIZE};
use crate::core::geo::{project, to_screen, GeoPoint, ScreenPoint, TileCoordinate, TileIndex};
use serde::{Deserialize, Serialize};

/// What the host asks to see: a geographic center and zoom on a surface of
/// fixed pixel size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: GeoPoint,
    /// The integer zoom level
    pub zoom: u8,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Edge length of one square tile in pixels
    pub tile_size: u32,
}

/// Square block of tiles covering a viewport, with up to one tile of overhang
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Top-left tile of the block
    pub origin: TileIndex,
    /// Tiles per row and per column
    pub tiles_per_axis: u32,
}

impl TileGrid {
    /// Every tile in the block, row by row
    pub fn tiles(&self) -> Vec<TileIndex> {
        let n = self.tiles_per_axis as i64;
        let mut tiles = Vec::with_capacity((n * n) as usize);
        for dy in 0..n {
            for dx in 0..n {
                tiles.push(TileIndex::new(
                    self.origin.x + dx,
                    self.origin.y + dy,
                    self.origin.zoom,
                ));
            }
        }
        tiles
    }

    pub fn len(&self) -> usize {
        (self.tiles_per_axis * self.tiles_per_axis) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.tiles_per_axis == 0
    }

    pub fn contains(&self, index: &TileIndex) -> bool {
        let n = self.tiles_per_axis as i64;
        index.zoom == self.origin.zoom
            && (self.origin.x..self.origin.x + n).contains(&index.x)
            && (self.origin.y..self.origin.y + n).contains(&index.y)
    }
}

impl Viewport {
    /// Creates a new viewport using the default tile size
    pub fn new(center: GeoPoint, zoom: u8, width: u32, height: u32) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
            tile_size: TILE_SIZE,
        }
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Fractional tile-plane position of the center
    pub fn center_coordinate(&self) -> TileCoordinate {
        project(&self.center, self.zoom)
    }

    /// Surface midpoint, where the center always lands
    pub fn midpoint(&self) -> ScreenPoint {
        ScreenPoint::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Longer surface side in tiles, plus one
    pub fn tiles_per_axis(&self) -> u32 {
        let longest = self.width.max(self.height) as f64;
        let tile = self.tile_size.max(1) as f64;
        ((longest / tile).ceil() as u32).saturating_add(1)
    }

    /// Square block of tiles to fetch.
    ///
    /// The origin is the tile under the surface's top-left corner, which is
    /// one tile up-left of the center tile on small surfaces. From there
    /// `tiles_per_axis` tiles reach past the opposite edges for any center
    /// alignment.
    pub fn tile_grid(&self) -> TileGrid {
        let center = self.center_coordinate();
        let tile = self.tile_size.max(1) as f64;
        let half_w = self.width as f64 / 2.0 / tile;
        let half_h = self.height as f64 / 2.0 / tile;
        TileGrid {
            origin: TileIndex::new(
                (center.x - half_w).floor() as i64,
                (center.y - half_h).floor() as i64,
                self.zoom,
            ),
            tiles_per_axis: self.tiles_per_axis(),
        }
    }

    /// Surface position of a tile's top-left corner
    pub fn tile_screen_position(&self, index: &TileIndex) -> ScreenPoint {
        let center = self.center_coordinate();
        let size = self.tile_size as f64;
        ScreenPoint::new(
            (index.x as f64 - center.x) * size + self.width as f64 / 2.0,
            (index.y as f64 - center.y) * size + self.height as f64 / 2.0,
        )
    }

    /// Surface position of an arbitrary geographic point
    pub fn point_to_screen(&self, point: &GeoPoint) -> ScreenPoint {
        to_screen(
            point,
            &self.center,
            self.zoom,
            self.tile_size as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Ground distance covered by one pixel at the center latitude
    pub fn meters_per_pixel(&self) -> f64 {
        meters_per_pixel(self.center.lat, self.zoom)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        let (width, height) = crate::core::constants::DEFAULT_SURFACE_SIZE;
        Self::new(
            GeoPoint::default(),
            crate::core::constants::DEFAULT_ZOOM,
            width,
            height,
        )
    }
}

/// Meters per pixel for 256 px tiles at `latitude` and `zoom`
pub fn meters_per_pixel(latitude: f64, zoom: u8) -> f64 {
    EARTH_CIRCUMFERENCE_M * latitude.to_radians().cos() / 2_f64.powi(zoom as i32 + 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seattle() -> GeoPoint {
        GeoPoint::new(47.6062, -122.3321)
    }

    #[test]
    fn test_tiles_per_axis() {
        let viewport = Viewport::new(seattle(), 13, 800, 600);
        assert_eq!(viewport.tiles_per_axis(), 5);

        let square = Viewport::new(seattle(), 13, 256, 256);
        assert_eq!(square.tiles_per_axis(), 2);

        let tall = Viewport::new(seattle(), 13, 300, 1000);
        assert_eq!(tall.tiles_per_axis(), 5);
    }

    #[test]
    fn test_small_surface_origin_is_one_tile_up_left() {
        let viewport = Viewport::new(seattle(), 13, 256, 256);
        let center = viewport.center_coordinate().tile_index();
        let grid = viewport.tile_grid();

        assert_eq!(grid.origin, TileIndex::new(center.x - 1, center.y - 1, 13));
        assert_eq!(grid.len(), 4);
        assert!(grid.contains(&center));
    }

    #[test]
    fn test_tile_grid_origin_sits_under_top_left_corner() {
        // Seattle's center sits near the left of its tile column and the
        // bottom of its row
        let viewport = Viewport::new(seattle(), 13, 800, 600);
        let coord = viewport.center_coordinate();
        let center = coord.tile_index();
        let grid = viewport.tile_grid();

        assert!(coord.x - (center.x as f64) < 0.5625);
        assert_eq!(grid.origin.x, center.x - 2);
        assert_eq!(grid.origin.y, center.y - 1);
        assert_eq!(grid.origin.zoom, 13);
        assert_eq!(grid.len(), 25);
        assert!(grid.contains(&center));

        let tiles = grid.tiles();
        assert_eq!(tiles.len(), 25);
        assert_eq!(tiles[0], grid.origin);
        assert_eq!(tiles[1], TileIndex::new(grid.origin.x + 1, grid.origin.y, 13));
    }

    #[test]
    fn test_grid_covers_surface_for_any_alignment() {
        let centers = [
            seattle(),
            GeoPoint::new(-33.8688, 151.2093),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(64.1466, -21.9426),
        ];
        let sizes = [(800, 600), (256, 256), (300, 1000), (1024, 768), (513, 100)];

        for center in centers {
            for (width, height) in sizes {
                for zoom in [3, 11, 13, 17] {
                    let viewport = Viewport::new(center, zoom, width, height);
                    let grid = viewport.tile_grid();
                    let first = viewport.tile_screen_position(&grid.origin);
                    let span = (grid.tiles_per_axis * viewport.tile_size) as f64;

                    assert!(first.x <= 0.0 && first.y <= 0.0, "{:?}", viewport);
                    assert!(first.x + span >= width as f64, "{:?}", viewport);
                    assert!(first.y + span >= height as f64, "{:?}", viewport);
                }
            }
        }
    }

    #[test]
    fn test_zero_tile_size_does_not_overflow() {
        let viewport = Viewport::new(seattle(), 13, 800, 600).with_tile_size(0);
        assert!(viewport.tiles_per_axis() > 0);
        assert!(!viewport.tile_grid().is_empty());
    }

    #[test]
    fn test_center_tile_position_puts_center_on_midpoint() {
        let viewport = Viewport::new(seattle(), 13, 800, 600);
        let coord = viewport.center_coordinate();
        let index = coord.tile_index();
        let corner = viewport.tile_screen_position(&index);

        let center_px = ScreenPoint::new(
            corner.x + (coord.x - index.x as f64) * 256.0,
            corner.y + (coord.y - index.y as f64) * 256.0,
        );
        assert!((center_px.x - 400.0).abs() < 1e-6);
        assert!((center_px.y - 300.0).abs() < 1e-6);
        assert_eq!(viewport.point_to_screen(&viewport.center), viewport.midpoint());
    }

    #[test]
    fn test_meters_per_pixel_equator() {
        let mpp = meters_per_pixel(0.0, 13);
        assert!((mpp - 40_075_017.0 / 2_097_152.0).abs() < 1e-9);
        assert!((mpp - 19.11).abs() < 0.01);
    }

    #[test]
    fn test_meters_per_pixel_shrinks_with_latitude_and_zoom() {
        assert!(meters_per_pixel(60.0, 13) < meters_per_pixel(0.0, 13));
        assert!((meters_per_pixel(60.0, 13) * 2.0 - meters_per_pixel(0.0, 13)).abs() < 1e-6);
        assert!((meters_per_pixel(0.0, 14) * 2.0 - meters_per_pixel(0.0, 13)).abs() < 1e-9);
    }
}
