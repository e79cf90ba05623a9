//! Owns the active texture pair and turns "redraw please" into a frame.
//!
//! The coordinator never runs concurrently with itself: the host surface calls
//! [`RenderCoordinator::on_frame`] on its render thread, and a pending reload is
//! consumed at the top of that call before anything is drawn. Other threads only
//! touch the [`SharedRenderState`].

use anyhow::Result;
use tracing::{debug, info, trace, warn};

use super::state::SharedRenderState;
use crate::processing::PixelBuffer;
use crate::processing::synth::TextureSynthesizer;
use crate::processing::wallpaper::WallpaperLoader;

/// Rasters for one reload: the display-sized wallpaper and its cloud texture.
#[derive(Debug, Clone)]
pub struct TexturePair {
    pub sharp: PixelBuffer,
    pub cloud: PixelBuffer,
}

/// Produces fresh rasters for a display size.
pub trait TextureSource {
    fn produce(&mut self, display: (u32, u32)) -> TexturePair;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// GPU-side names of the active texture pair. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandles {
    pub sharp: TextureId,
    pub cloud: TextureId,
}

/// Per-frame shader inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub blend: f32,
    pub seed: f32,
}

/// Where frames go. Implemented by the GPU pipeline; tests use an in-memory fake.
pub trait FrameTarget {
    /// Upload both rasters and make them the active pair.
    fn upload(&mut self, textures: &TexturePair) -> Result<TextureHandles>;

    /// Draw one frame from `handles`. `Ok(false)` means the frame was skipped
    /// (surface busy or being reconfigured) and nothing was presented.
    fn draw(&mut self, handles: TextureHandles, uniforms: Uniforms) -> Result<bool>;

    fn resize(&mut self, _width: u32, _height: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    NoOp,
    Reloaded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub reload: ReloadOutcome,
    pub uniforms: Uniforms,
    pub drew: bool,
    /// Another frame was requested because this one left the screen stale.
    pub retry: bool,
}

pub struct RenderCoordinator<S, T> {
    source: S,
    target: T,
    shared: SharedRenderState,
    handles: Option<TextureHandles>,
    display: (u32, u32),
}

impl<S: TextureSource, T: FrameTarget> RenderCoordinator<S, T> {
    pub fn new(source: S, target: T, shared: SharedRenderState, display: (u32, u32)) -> Self {
        Self {
            source,
            target,
            shared,
            handles: None,
            display,
        }
    }

    pub fn shared(&self) -> &SharedRenderState {
        &self.shared
    }

    pub fn handles(&self) -> Option<TextureHandles> {
        self.handles
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn display(&self) -> (u32, u32) {
        self.display
    }

    pub fn request_reload(&self) {
        self.shared.request_reload();
    }

    pub fn set_blend(&self, blend: f32) {
        self.shared.set_blend(blend);
    }

    pub fn set_seed(&self, seed: f32) {
        self.shared.set_seed(seed);
    }

    /// Track a new surface size. Textures are rebuilt for it on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.target.resize(width, height);
        if (width, height) != self.display {
            debug!(width, height, "display size changed");
            self.display = (width, height);
            self.shared.request_reload();
        }
    }

    /// Consume a pending reload, replacing both texture handles at once.
    ///
    /// If the upload fails the previous pair stays active and the request stays
    /// pending. A request that arrives while this runs is kept for the next frame.
    pub fn take_reload(&mut self) -> ReloadOutcome {
        let Some(generation) = self.shared.pending_reload() else {
            return ReloadOutcome::NoOp;
        };
        let textures = self.source.produce(self.display);
        match self.target.upload(&textures) {
            Ok(handles) => {
                self.handles = Some(handles);
                if !self.shared.finish_reload(generation) {
                    debug!("reload requested again during reload; keeping flag");
                }
                info!(
                    sharp = ?textures.sharp.dimensions(),
                    cloud = ?textures.cloud.dimensions(),
                    "textures reloaded"
                );
                ReloadOutcome::Reloaded
            }
            Err(err) => {
                warn!(error = ?err, "texture upload failed; keeping previous textures");
                ReloadOutcome::NoOp
            }
        }
    }

    /// Called by the surface whenever a redraw is needed.
    ///
    /// Frames are only drawn on request, so a skipped draw or a reload still
    /// pending asks for another frame rather than waiting for the next event.
    pub fn on_frame(&mut self) -> Result<FrameReport> {
        let reload = self.take_reload();
        let state = self.shared.snapshot();
        let uniforms = Uniforms {
            blend: state.blend,
            seed: state.seed,
        };
        let drew = match self.handles {
            Some(handles) => self.target.draw(handles, uniforms)?,
            None => false,
        };
        let retry = state.reload_pending || (!drew && self.handles.is_some());
        if retry {
            trace!(drew, reload_pending = state.reload_pending, "frame left stale; redrawing");
            self.shared.request_redraw();
        }
        Ok(FrameReport {
            reload,
            uniforms,
            drew,
            retry,
        })
    }
}

/// Stored wallpaper plus synthesized cloud, rebuilt on every reload.
pub struct AtmosphereSource {
    loader: WallpaperLoader,
    synth: TextureSynthesizer,
}

impl AtmosphereSource {
    pub fn new(loader: WallpaperLoader, synth: TextureSynthesizer) -> Self {
        Self { loader, synth }
    }
}

impl TextureSource for AtmosphereSource {
    fn produce(&mut self, (width, height): (u32, u32)) -> TexturePair {
        let sharp = self.loader.load(width, height);
        let cloud = self.synth.synthesize(&sharp);
        TexturePair { sharp, cloud }
    }
}
