//! Linear-time stack blur.
//!
//! Two passes (rows, then columns) of a sliding window whose weights fall off
//! linearly from the centre: the sample at offset `i` contributes
//! `radius + 1 - |i|`. Running "in" and "out" sums make each step of the window
//! O(1), so the cost is O(width * height) for any radius. Samples past the edge
//! replicate the nearest row/column.

use super::pixel_buffer::{CHANNELS, PixelBuffer};

/// Largest radius honoured; bigger requests are clamped. Keeps the division table
/// at `256 * 255^2` entries in the worst case.
pub const MAX_RADIUS: usize = 254;

type Rgb = [u32; 3];

/// Blur `image` with the given radius. `radius < 1` returns the input unchanged.
/// The output alpha channel is always opaque.
#[must_use]
pub fn blur(image: &PixelBuffer, radius: i32) -> PixelBuffer {
    if radius < 1 {
        return image.clone();
    }
    let mut out = image.clone();
    blur_in_place(&mut out, radius as usize);
    out
}

/// In-place variant of [`blur`]; `radius == 0` is a no-op.
pub fn blur_in_place(image: &mut PixelBuffer, radius: usize) {
    if radius == 0 {
        return;
    }
    let radius = radius.min(MAX_RADIUS);
    let (w, h) = (image.width() as usize, image.height() as usize);
    let table = DivisionTable::new(radius);
    let mut stack: Vec<Rgb> = vec![[0; 3]; 2 * radius + 1];
    let mut mid: Vec<[u8; 3]> = vec![[0; 3]; w * h];

    {
        let src = image.as_bytes();
        for y in 0..h {
            let row = y * w;
            blur_line(
                w,
                radius,
                &table,
                &mut stack,
                |x| {
                    let i = (row + x) * CHANNELS;
                    [src[i] as u32, src[i + 1] as u32, src[i + 2] as u32]
                },
                |x, rgb| mid[row + x] = rgb,
            );
        }
    }

    let dst = image.as_bytes_mut();
    for x in 0..w {
        blur_line(
            h,
            radius,
            &table,
            &mut stack,
            |y| {
                let [r, g, b] = mid[y * w + x];
                [r as u32, g as u32, b as u32]
            },
            |y, [r, g, b]| {
                let i = (y * w + x) * CHANNELS;
                dst[i] = r;
                dst[i + 1] = g;
                dst[i + 2] = b;
                dst[i + 3] = u8::MAX;
            },
        );
    }
}

/// Lookup replacing `sum / (radius + 1)^2` for every reachable sum.
struct DivisionTable {
    lut: Vec<u8>,
}

impl DivisionTable {
    fn new(radius: usize) -> Self {
        let div = 2 * radius + 1;
        let divisor = ((div + 1) >> 1).pow(2);
        let lut = (0..256 * divisor).map(|i| (i / divisor) as u8).collect();
        Self { lut }
    }

    #[inline]
    fn divide(&self, sum: Rgb) -> [u8; 3] {
        [
            self.lut[sum[0] as usize],
            self.lut[sum[1] as usize],
            self.lut[sum[2] as usize],
        ]
    }
}

#[inline]
fn add(acc: &mut Rgb, v: Rgb) {
    acc[0] += v[0];
    acc[1] += v[1];
    acc[2] += v[2];
}

#[inline]
fn sub(acc: &mut Rgb, v: Rgb) {
    acc[0] -= v[0];
    acc[1] -= v[1];
    acc[2] -= v[2];
}

/// Blur one row or column of `len` samples.
///
/// `stack` is a ring of the `2r + 1` samples currently under the window; entries
/// left of (and at) the centre feed `sum_out`, entries right of it feed `sum_in`.
fn blur_line(
    len: usize,
    radius: usize,
    table: &DivisionTable,
    stack: &mut [Rgb],
    read: impl Fn(usize) -> Rgb,
    mut write: impl FnMut(usize, [u8; 3]),
) {
    let div = stack.len();
    let last = len - 1;

    let mut sum: Rgb = [0; 3];
    let mut sum_in: Rgb = [0; 3];
    let mut sum_out: Rgb = [0; 3];

    for (slot, entry) in stack.iter_mut().enumerate() {
        let offset = slot as isize - radius as isize;
        let sample = read((offset.max(0) as usize).min(last));
        *entry = sample;
        let weight = (radius + 1 - offset.unsigned_abs()) as u32;
        sum[0] += sample[0] * weight;
        sum[1] += sample[1] * weight;
        sum[2] += sample[2] * weight;
        if offset > 0 {
            add(&mut sum_in, sample);
        } else {
            add(&mut sum_out, sample);
        }
    }

    let mut pointer = radius;
    for pos in 0..len {
        write(pos, table.divide(sum));

        sub(&mut sum, sum_out);

        // The oldest entry (pos - r) leaves the window; reuse its slot for pos + r + 1.
        let start = (pointer + div - radius) % div;
        sub(&mut sum_out, stack[start]);
        let incoming = read((pos + radius + 1).min(last));
        stack[start] = incoming;
        add(&mut sum_in, incoming);
        add(&mut sum, sum_in);

        pointer = (pointer + 1) % div;
        let centre = stack[pointer];
        add(&mut sum_out, centre);
        sub(&mut sum_in, centre);
    }
}
