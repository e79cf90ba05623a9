//! Lifecycle callbacks a hosting surface drives.
//!
//! The host guarantees `on_surface_created` happens before any draw and never
//! calls `on_draw_frame` concurrently with itself.

use anyhow::Result;
use tracing::debug;

use super::coordinator::{FrameReport, FrameTarget, RenderCoordinator, TextureSource};

pub trait SurfaceRenderer {
    fn on_surface_created(&mut self);
    fn on_surface_changed(&mut self, width: u32, height: u32);
    fn on_draw_frame(&mut self) -> Result<FrameReport>;
}

impl<S: TextureSource, T: FrameTarget> SurfaceRenderer for RenderCoordinator<S, T> {
    /// A new surface has no textures yet; build them on the first frame.
    fn on_surface_created(&mut self) {
        debug!(display = ?self.display(), "surface created");
        self.request_reload();
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.resize(width, height);
    }

    fn on_draw_frame(&mut self) -> Result<FrameReport> {
        self.on_frame()
    }
}
