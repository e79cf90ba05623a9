//! Owned RGBA8 raster passed between the loader, the synthesizer and the GPU upload.

use image::RgbaImage;

use crate::error::Error;

/// Bytes per pixel (RGBA8).
pub const CHANNELS: usize = 4;

/// A row-major RGBA8 raster. `pixels.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap an existing pixel array.
    ///
    /// # Errors
    /// Returns [`Error::EmptyBuffer`] for a zero dimension and [`Error::BufferSize`]
    /// when `pixels` does not hold exactly `width * height` RGBA samples.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyBuffer { width, height });
        }
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A raster of a single colour. Zero dimensions are bumped to one.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes, row-major.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Read one pixel.
    ///
    /// # Panics
    /// Panics if `(x, y)` lies outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Overwrite one pixel.
    ///
    /// # Panics
    /// Panics if `(x, y)` lies outside the raster.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.pixels
            .chunks_exact(CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Copy into an `image` crate buffer (for encoding to disk).
    #[must_use]
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .expect("pixel buffer length matches its dimensions")
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = Error;

    fn try_from(image: RgbaImage) -> Result<Self, Self::Error> {
        let (width, height) = image.dimensions();
        Self::from_raw(width, height, image.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_length() {
        let err = PixelBuffer::from_raw(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferSize {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(matches!(
            PixelBuffer::from_raw(0, 3, Vec::new()),
            Err(Error::EmptyBuffer { .. })
        ));
    }

    #[test]
    fn filled_bumps_zero_dimensions() {
        let buf = PixelBuffer::filled(0, 0, [1, 2, 3, 4]);
        assert_eq!(buf.dimensions(), (1, 1));
        assert_eq!(buf.pixel(0, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn put_and_read_pixel() {
        let mut buf = PixelBuffer::filled(3, 2, [0, 0, 0, 255]);
        buf.put_pixel(2, 1, [9, 8, 7, 6]);
        assert_eq!(buf.pixel(2, 1), [9, 8, 7, 6]);
        assert_eq!(buf.as_bytes().len(), 3 * 2 * CHANNELS);
    }

    #[test]
    fn converts_from_rgba_image() {
        let img = RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255]));
        let buf = PixelBuffer::try_from(img).unwrap();
        assert_eq!(buf.dimensions(), (4, 3));
        assert!(buf.pixels().all(|p| p == [10, 20, 30, 255]));
        assert_eq!(buf.to_rgba_image().get_pixel(3, 2).0, [10, 20, 30, 255]);
    }
}
