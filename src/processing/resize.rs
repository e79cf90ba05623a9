use anyhow::{Context, Result};
use fast_image_resize as fir;

use super::layout::cover_crop;
use super::pixel_buffer::PixelBuffer;

/// Resampling used by [`resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Box filter; averages the covered source area when shrinking.
    Area,
    /// Catmull-Rom; used for the displayed wallpaper.
    Smooth,
}

impl Filter {
    fn algorithm(self) -> fir::ResizeAlg {
        match self {
            Self::Area => fir::ResizeAlg::Convolution(fir::FilterType::Box),
            Self::Smooth => fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom),
        }
    }
}

/// Resize the whole source to exactly `target_w x target_h`.
pub fn resize(
    source: &PixelBuffer,
    target_w: u32,
    target_h: u32,
    filter: Filter,
) -> Result<PixelBuffer> {
    let options = fir::ResizeOptions::new().resize_alg(filter.algorithm());
    run(source, target_w, target_h, &options)
}

/// Scale and centre-crop the source so it covers `target_w x target_h` without letterboxing.
pub fn aspect_fill(source: &PixelBuffer, target_w: u32, target_h: u32) -> Result<PixelBuffer> {
    let crop = cover_crop(source.width(), source.height(), target_w, target_h);
    let options = fir::ResizeOptions::new()
        .resize_alg(Filter::Smooth.algorithm())
        .crop(crop.left, crop.top, crop.width, crop.height);
    run(source, target_w, target_h, &options)
}

fn run(
    source: &PixelBuffer,
    target_w: u32,
    target_h: u32,
    options: &fir::ResizeOptions,
) -> Result<PixelBuffer> {
    if target_w == 0 || target_h == 0 {
        anyhow::bail!("resize dimensions must be positive");
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_bytes(),
        fir::PixelType::U8x4,
    )
    .context("failed to create source view for resize")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(options))
        .context("resize failed")?;
    PixelBuffer::from_raw(target_w, target_h, dst_image.into_vec())
        .context("resize produced a malformed raster")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(a: [u8; 4], b: [u8; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    #[test]
    fn area_downsample_averages_halves() {
        let mut src = PixelBuffer::filled(4, 2, [0, 0, 0, 255]);
        for y in 0..2 {
            for x in 2..4 {
                src.put_pixel(x, y, [200, 100, 50, 255]);
            }
        }
        let out = resize(&src, 2, 1, Filter::Area).unwrap();
        assert!(near(out.pixel(0, 0), [0, 0, 0, 255]));
        assert!(near(out.pixel(1, 0), [200, 100, 50, 255]));
    }

    #[test]
    fn aspect_fill_keeps_centre_of_wide_source() {
        // blue and red bands far outside the centred 10x10 window
        let mut src = PixelBuffer::filled(60, 10, [0, 255, 0, 255]);
        for y in 0..10 {
            for x in 0..10 {
                src.put_pixel(x, y, [0, 0, 255, 255]);
                src.put_pixel(x + 50, y, [255, 0, 0, 255]);
            }
        }
        let out = aspect_fill(&src, 8, 8).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.pixels().all(|p| near(p, [0, 255, 0, 255])));
    }

    #[test]
    fn zero_target_is_rejected() {
        let src = PixelBuffer::filled(2, 2, [1, 1, 1, 255]);
        assert!(resize(&src, 0, 2, Filter::Area).is_err());
    }
}
