/// Output size for a display: width capped at `max_width`, display aspect ratio preserved.
pub fn bounded_target(display_w: u32, display_h: u32, max_width: u32) -> (u32, u32) {
    let dw = display_w.max(1);
    let dh = display_h.max(1);
    let w = dw.min(max_width.max(1));
    let h = ((w as f64 / dw as f64) * dh as f64).round().max(1.0);
    (w, h as u32)
}

/// Source rectangle (in source pixels) that aspect-fills a `dst_w x dst_h` target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Centre crop for aspect-fill: scale = max(dst_w / src_w, dst_h / src_h), so the
/// shorter source side fully covers the target and the overflow is cut evenly.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> CropRect {
    let sw = src_w.max(1) as f64;
    let sh = src_h.max(1) as f64;
    let dw = dst_w.max(1) as f64;
    let dh = dst_h.max(1) as f64;
    let scale = (dw / sw).max(dh / sh);
    let width = (dw / scale).min(sw);
    let height = (dh / scale).min(sh);
    CropRect {
        left: (sw - width) / 2.0,
        top: (sh - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn narrow_display_is_kept() {
        assert_eq!(bounded_target(1080, 1920, 1440), (1080, 1920));
    }

    #[test]
    fn wide_display_is_capped_with_aspect() {
        assert_eq!(bounded_target(2560, 1600, 1440), (1440, 900));
        assert_eq!(bounded_target(2880, 1620, 1440), (1440, 810));
    }

    #[test]
    fn degenerate_display_yields_pixel() {
        assert_eq!(bounded_target(0, 0, 1440), (1, 1));
    }

    #[test]
    fn wide_source_is_cropped_horizontally() {
        // 4000x1000 into 100x100: scale = max(0.025, 0.1) = 0.1, window = 1000x1000
        let crop = cover_crop(4000, 1000, 100, 100);
        assert!(close(crop.width, 1000.0));
        assert!(close(crop.height, 1000.0));
        assert!(close(crop.left, 1500.0));
        assert!(close(crop.top, 0.0));
    }

    #[test]
    fn tall_source_is_cropped_vertically() {
        let crop = cover_crop(1000, 3000, 1440, 900);
        // scale = max(1.44, 0.3) = 1.44 -> window 1000x625
        assert!(close(crop.width, 1000.0));
        assert!(close(crop.height, 625.0));
        assert!(close(crop.left, 0.0));
        assert!(close(crop.top, 1187.5));
    }

    #[test]
    fn tiny_source_upscales_whole_image() {
        let crop = cover_crop(4, 4, 1080, 1920);
        // scale = max(270, 480) = 480 -> window 2.25x4
        assert!(close(crop.height, 4.0));
        assert!(close(crop.width, 2.25));
        assert!(close(crop.left, 0.875));
    }
}
