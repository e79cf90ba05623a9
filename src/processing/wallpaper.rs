use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use jpeg_decoder::{Decoder as JpegDecoder, PixelFormat};
use tracing::{debug, info, warn};

use super::layout::bounded_target;
use super::pixel_buffer::PixelBuffer;
use super::resize::aspect_fill;
use crate::config::Configuration;
use crate::error::Error;

/// JPEG quality used for the stored wallpaper.
pub const STORE_QUALITY: u8 = 95;

/// Loads the fixed stored wallpaper at display resolution.
///
/// Loading never fails: a missing or unreadable file yields a solid placeholder
/// raster of the same target size.
#[derive(Debug, Clone)]
pub struct WallpaperLoader {
    path: PathBuf,
    max_width: u32,
    placeholder: [u8; 4],
}

impl WallpaperLoader {
    pub fn new(path: PathBuf, max_width: u32, placeholder: [u8; 4]) -> Self {
        Self {
            path,
            max_width,
            placeholder,
        }
    }

    pub fn from_config(cfg: &Configuration) -> Self {
        Self::new(
            cfg.wallpaper_path.clone(),
            cfg.max_width,
            cfg.placeholder_rgba(),
        )
    }

    /// Size of every raster returned for this display.
    pub fn target_size(&self, display_w: u32, display_h: u32) -> (u32, u32) {
        bounded_target(display_w, display_h, self.max_width)
    }

    /// Aspect-filled wallpaper for the display, or the placeholder.
    pub fn load(&self, display_w: u32, display_h: u32) -> PixelBuffer {
        let (target_w, target_h) = self.target_size(display_w, display_h);
        match self.try_load(target_w, target_h) {
            Ok(buffer) => {
                debug!(
                    path = %self.path.display(),
                    width = target_w,
                    height = target_h,
                    "loaded stored wallpaper"
                );
                buffer
            }
            Err(err) => {
                if self.path.exists() {
                    warn!(
                        path = %self.path.display(),
                        error = ?err,
                        "stored wallpaper unreadable; using placeholder"
                    );
                } else {
                    info!(path = %self.path.display(), "no stored wallpaper; using placeholder");
                }
                PixelBuffer::filled(target_w, target_h, self.placeholder)
            }
        }
    }

    fn try_load(&self, target_w: u32, target_h: u32) -> Result<PixelBuffer> {
        let source = self.decode(target_w, target_h)?;
        let source = PixelBuffer::try_from(source)?;
        aspect_fill(&source, target_w, target_h)
    }

    fn decode(&self, target_w: u32, target_h: u32) -> Result<RgbaImage> {
        let reader = ImageReader::open(&self.path)
            .with_context(|| format!("failed to open wallpaper at {}", self.path.display()))?
            .with_guessed_format()
            .context("failed to guess wallpaper format")?;

        if matches!(reader.format(), Some(ImageFormat::Jpeg)) {
            match self.decode_jpeg_scaled(target_w, target_h) {
                Ok(img) => return Ok(img),
                Err(err) => {
                    debug!(
                        "failed to decode JPEG {:?} with scaled fast path: {err:#}; falling back",
                        self.path
                    );
                }
            }
        }

        Ok(reader
            .decode()
            .with_context(|| format!("failed to decode wallpaper at {}", self.path.display()))?
            .to_rgba8())
    }

    /// DCT-domain downscale to the smallest size still covering the target.
    fn decode_jpeg_scaled(&self, target_w: u32, target_h: u32) -> Result<RgbaImage> {
        let file = fs::File::open(&self.path)?;
        let mut decoder = JpegDecoder::new(BufReader::new(file));
        decoder.read_info()?;
        let info = decoder
            .info()
            .ok_or_else(|| anyhow!("missing JPEG header in {}", self.path.display()))?;
        // Scaling is uniform, so request the aspect-fill size rather than the target box.
        let scale = (target_w as f64 / info.width.max(1) as f64)
            .max(target_h as f64 / info.height.max(1) as f64);
        let request_w = (info.width as f64 * scale).ceil().clamp(1.0, u16::MAX as f64) as u16;
        let request_h = (info.height as f64 * scale).ceil().clamp(1.0, u16::MAX as f64) as u16;
        decoder.scale(request_w, request_h)?;

        let pixels = decoder.decode()?;
        let info = decoder
            .info()
            .ok_or_else(|| anyhow!("missing image info for {}", self.path.display()))?;
        let (width, height) = (info.width as u32, info.height as u32);

        let rgba = match info.pixel_format {
            PixelFormat::RGB24 => {
                let mut rgba = Vec::with_capacity(pixels.len() / 3 * 4);
                for chunk in pixels.chunks_exact(3) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
                }
                rgba
            }
            PixelFormat::L8 => {
                let mut rgba = Vec::with_capacity(pixels.len() * 4);
                for &v in &pixels {
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
                rgba
            }
            other => anyhow::bail!("scaled decoder does not handle {other:?}"),
        };

        RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| anyhow!("failed to construct RGBA image for {}", self.path.display()))
    }
}

/// Persist `image` as the fixed-name wallpaper.
///
/// The JPEG is written next to `path` and renamed into place, so readers and
/// file watchers never observe a half-written file.
pub fn store(path: &Path, image: &RgbaImage) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    {
        let file = fs::File::create(&staging)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, STORE_QUALITY).encode_image(&rgb)?;
        writer.flush()?;
    }
    fs::rename(&staging, path)?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "stored wallpaper"
    );
    Ok(())
}
