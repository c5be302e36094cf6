//! Risk disc and center marker drawn on top of the composited tiles

use crate::core::config::StyleConfig;
use crate::core::geo::GeoPoint;
use crate::core::viewport::{meters_per_pixel, Viewport};
use crate::rendering::surface::DrawSurface;
use image::{Pixel, Rgba};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, Blend};

/// Disc of fixed real-world radius around a geographic point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl Overlay {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    /// Radius in surface pixels at `zoom`, corrected for the center latitude
    pub fn radius_px(&self, zoom: u8) -> f64 {
        self.radius_meters / meters_per_pixel(self.center.lat, zoom)
    }

    /// Draws disc fill, white outline, then the marker dot.
    ///
    /// Must run after every tile of the render has settled, otherwise a late
    /// tile would paint over it.
    pub fn draw(&self, surface: &mut DrawSurface, viewport: &Viewport, style: &StyleConfig) {
        let (cx, cy) = viewport.point_to_screen(&self.center).round();
        let center = (cx as i32, cy as i32);
        let radius = self.radius_px(viewport.zoom).round().min(i32::MAX as f64 / 4.0) as i32;

        log::debug!(
            "overlay at ({}, {}) radius {} px for {} m",
            center.0,
            center.1,
            radius,
            self.radius_meters
        );

        let reach = corner_reach(surface, center);
        if radius as f64 > reach + style.outline_width as f64 {
            // Disc covers the whole surface and its outline lies off-surface
            let fill = rgba(style.disc_fill, style.disc_alpha);
            for pixel in surface.image_mut().pixels_mut() {
                pixel.blend(&fill);
            }
        } else if radius > 0 {
            let fill = rgba(style.disc_fill, style.disc_alpha);
            let mut blended = Blend(std::mem::take(surface.image_mut()));
            draw_filled_circle_mut(&mut blended, center, radius, fill);
            *surface.image_mut() = blended.0;

            let outline = rgba(style.outline, 255);
            for ring in 0..style.outline_width as i32 {
                if radius - ring > 0 {
                    draw_hollow_circle_mut(surface.image_mut(), center, radius - ring, outline);
                }
            }
        }

        let marker_radius = style.marker_radius as i32;
        draw_filled_circle_mut(
            surface.image_mut(),
            center,
            marker_radius,
            rgba(style.marker_fill, 255),
        );
        draw_hollow_circle_mut(
            surface.image_mut(),
            center,
            marker_radius,
            rgba(style.marker_outline, 255),
        );
    }
}

/// Distance from `center` to the farthest surface corner
fn corner_reach(surface: &DrawSurface, center: (i32, i32)) -> f64 {
    let (cx, cy) = (center.0 as f64, center.1 as f64);
    let (w, h) = (surface.width() as f64, surface.height() as f64);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
        .iter()
        .map(|(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .fold(0.0, f64::max)
}

fn rgba(rgb: [u8; 3], alpha: u8) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], alpha])
}
