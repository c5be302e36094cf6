use crate::{MapError, Result};
use image::{imageops, Rgba, RgbaImage};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Surface shared between the compositor's tile tasks
pub type SharedSurface = Arc<Mutex<DrawSurface>>;

/// Fixed-size RGBA pixel canvas.
///
/// The size is set once at creation. Every redraw starts with [`clear`],
/// so nothing carries over between renders.
///
/// [`clear`]: DrawSurface::clear
#[derive(Debug, Clone)]
pub struct DrawSurface {
    pixels: RgbaImage,
}

impl DrawSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn shared(width: u32, height: u32) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Paints every pixel with an opaque flat color
    pub fn clear(&mut self, rgb: [u8; 3]) {
        let color = Rgba([rgb[0], rgb[1], rgb[2], 255]);
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    /// Copies `tile` with its top-left corner at `(x, y)`; parts outside the
    /// surface are clipped
    pub fn draw_image(&mut self, tile: &RgbaImage, x: i64, y: i64) {
        imageops::replace(&mut self.pixels, tile, x, y);
    }

    /// Decodes an encoded tile (PNG/JPEG) and draws it at `(x, y)`
    pub fn draw_encoded(&mut self, bytes: &[u8], x: i64, y: i64) -> Result<()> {
        let tile = decode_tile(bytes)?;
        self.draw_image(&tile, x, y);
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width() && y < self.height() {
            Some(self.pixels.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixels
            .save_with_format(path.as_ref(), image::ImageFormat::Png)?;
        Ok(())
    }

    /// PNG-encoded copy of the surface
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(self.pixels.clone())
            .write_to(&mut out, image::ImageOutputFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Decodes tile bytes into RGBA, whatever format the server sent
pub fn decode_tile(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        return Err(MapError::Render("empty tile body".to_string()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(size: u32, rgb: [u8; 3]) -> Vec<u8> {
        let mut tile = DrawSurface::new(size, size);
        tile.clear(rgb);
        tile.to_png_bytes().unwrap()
    }

    #[test]
    fn test_clear_fills_every_pixel() {
        let mut surface = DrawSurface::new(4, 3);
        surface.clear([10, 20, 30]);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y), Some([10, 20, 30, 255]));
            }
        }
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn test_draw_encoded_clips_to_surface() {
        let mut surface = DrawSurface::new(10, 10);
        surface.clear([0, 0, 0]);
        let tile = solid_png(8, [200, 100, 50]);

        // Hangs off the top-left corner
        surface.draw_encoded(&tile, -4, -4).unwrap();
        assert_eq!(surface.pixel(0, 0), Some([200, 100, 50, 255]));
        assert_eq!(surface.pixel(3, 3), Some([200, 100, 50, 255]));
        assert_eq!(surface.pixel(4, 4), Some([0, 0, 0, 255]));

        // Entirely outside: nothing happens
        surface.draw_encoded(&tile, 50, 50).unwrap();
        assert_eq!(surface.pixel(9, 9), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(decode_tile(b"not a png"), Err(MapError::Image(_))));
        assert!(matches!(decode_tile(b""), Err(MapError::Render(_))));
    }
}
