//! Cloud texture synthesis.
//!
//! The source is reduced to a coarse palette grid; every cell becomes a paint
//! zone drawn as two jittered disks (a main cloud and a smaller satellite of the
//! same colour that plugs the gaps the jitter opens). Zones are painted in
//! shuffled order so overlaps do not follow the grid scan, and the canvas is
//! finally melted together with a stack blur.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::pixel_buffer::PixelBuffer;
use super::resize::{Filter, resize};
use super::stack_blur::blur_in_place;
use crate::config::SynthesisOptions;

/// One coarse sample of the source: a paint colour and its centre on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteCell {
    pub color: [u8; 4],
    pub center: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

/// The two disks painted for one palette cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintZone {
    pub cell: PaletteCell,
    pub main: Circle,
    pub satellite: Circle,
}

pub struct TextureSynthesizer<R = StdRng> {
    options: SynthesisOptions,
    rng: R,
}

impl TextureSynthesizer<StdRng> {
    /// Seeded from `options.seed` when set, otherwise from the OS.
    pub fn from_options(options: SynthesisOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { options, rng }
    }
}

impl<R: Rng> TextureSynthesizer<R> {
    pub fn with_rng(options: SynthesisOptions, rng: R) -> Self {
        Self { options, rng }
    }

    /// Build the `texture_size x texture_size` cloud raster for `source`.
    pub fn synthesize(&mut self, source: &PixelBuffer) -> PixelBuffer {
        let size = self.options.texture_size.max(1);
        let cols = self.options.grid_cols.max(1);
        let rows = self.options.grid_rows.max(1);

        let palette = sample_palette(source, cols, rows);
        let background = palette.pixel(cols / 2, rows / 2);
        let mut canvas = PixelBuffer::filled(size, size, background);

        let zones = self.plan_zones(&palette, size);
        for zone in &zones {
            fill_circle(&mut canvas, zone.main, zone.cell.color);
            fill_circle(&mut canvas, zone.satellite, zone.cell.color);
        }

        blur_in_place(&mut canvas, self.options.blur_radius as usize);
        debug!(
            size,
            zones = zones.len(),
            radius = self.options.blur_radius,
            "synthesized cloud texture"
        );
        canvas
    }

    /// Shuffle the palette cells and jitter their disks. Exposed so placement can be
    /// checked without painting.
    pub fn plan_zones(&mut self, palette: &PixelBuffer, size: u32) -> Vec<PaintZone> {
        let mut cells = palette_cells(palette, size);
        cells.shuffle(&mut self.rng);

        let cell_w = size as f32 / palette.width() as f32;
        let cell_h = size as f32 / palette.height() as f32;
        let rng = &mut self.rng;
        cells
            .into_iter()
            .map(|cell| {
                let (cx, cy) = cell.center;
                let shift_x = (rng.random::<f32>() - 0.5) * cell_w * 3.0;
                let shift_y = (rng.random::<f32>() - 0.5) * cell_h * 3.0;
                let radius = cell_w.max(cell_h) * (1.5 + rng.random::<f32>() * 2.0);
                let sat_x = (rng.random::<f32>() - 0.5) * cell_w * 4.0;
                let sat_y = (rng.random::<f32>() - 0.5) * cell_h * 4.0;
                PaintZone {
                    cell,
                    main: Circle {
                        cx: cx + shift_x,
                        cy: cy + shift_y,
                        radius,
                    },
                    satellite: Circle {
                        cx: cx + sat_x,
                        cy: cy + sat_y,
                        radius: radius * 0.6,
                    },
                }
            })
            .collect()
    }
}

/// Area-average the source down to a `cols x rows` palette grid.
pub fn sample_palette(source: &PixelBuffer, cols: u32, rows: u32) -> PixelBuffer {
    match resize(source, cols, rows, Filter::Area) {
        Ok(palette) => palette,
        Err(err) => {
            warn!(error = ?err, "palette resample failed; falling back to point sampling");
            point_sample(source, cols, rows)
        }
    }
}

fn point_sample(source: &PixelBuffer, cols: u32, rows: u32) -> PixelBuffer {
    let mut out = PixelBuffer::filled(cols, rows, [0, 0, 0, 255]);
    for y in 0..rows {
        for x in 0..cols {
            let sx = ((x as u64 * 2 + 1) * source.width() as u64 / (cols as u64 * 2)) as u32;
            let sy = ((y as u64 * 2 + 1) * source.height() as u64 / (rows as u64 * 2)) as u32;
            out.put_pixel(x, y, source.pixel(sx, sy));
        }
    }
    out
}

/// Palette cells in raster order, centred on their cell of a `size x size` canvas.
pub fn palette_cells(palette: &PixelBuffer, size: u32) -> Vec<PaletteCell> {
    let (cols, rows) = palette.dimensions();
    let cell_w = size as f32 / cols as f32;
    let cell_h = size as f32 / rows as f32;
    let mut cells = Vec::with_capacity(cols as usize * rows as usize);
    for y in 0..rows {
        for x in 0..cols {
            cells.push(PaletteCell {
                color: palette.pixel(x, y),
                center: (
                    x as f32 * cell_w + cell_w / 2.0,
                    y as f32 * cell_h + cell_h / 2.0,
                ),
            });
        }
    }
    cells
}

/// Paint an anti-aliased filled disk, clipped to the canvas.
fn fill_circle(canvas: &mut PixelBuffer, circle: Circle, color: [u8; 4]) {
    let (w, h) = canvas.dimensions();
    let reach = circle.radius + 0.5;
    let x0 = (circle.cx - reach).floor().max(0.0) as u32;
    let y0 = (circle.cy - reach).floor().max(0.0) as u32;
    let x1 = ((circle.cx + reach).ceil().max(0.0) as u32).min(w);
    let y1 = ((circle.cy + reach).ceil().max(0.0) as u32).min(h);

    for y in y0..y1 {
        let dy = y as f32 + 0.5 - circle.cy;
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - circle.cx;
            let coverage = (reach - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }
            if coverage >= 1.0 {
                canvas.put_pixel(x, y, color);
                continue;
            }
            let dst = canvas.pixel(x, y);
            let mix = |s: u8, d: u8| (d as f32 + (s as f32 - d as f32) * coverage).round() as u8;
            canvas.put_pixel(
                x,
                y,
                [
                    mix(color[0], dst[0]),
                    mix(color[1], dst[1]),
                    mix(color[2], dst[2]),
                    mix(color[3], dst[3]),
                ],
            );
        }
    }
}
