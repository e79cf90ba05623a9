use std::collections::HashSet;

use anyhow::{Result, bail};
use atmosphere_wallpaper::config::SynthesisOptions;
use atmosphere_wallpaper::processing::synth::TextureSynthesizer;
use atmosphere_wallpaper::processing::wallpaper::WallpaperLoader;
use atmosphere_wallpaper::render::coordinator::{
    AtmosphereSource, FrameTarget, ReloadOutcome, RenderCoordinator, TextureHandles, TextureId,
    TexturePair, Uniforms,
};
use atmosphere_wallpaper::render::state::SharedRenderState;
use atmosphere_wallpaper::render::surface::SurfaceRenderer;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Records what a GPU would have received.
#[derive(Default)]
struct RecordingTarget {
    next: u64,
    uploads: Vec<((u32, u32), (u32, u32))>,
    frames: Vec<(TextureHandles, Uniforms)>,
    reject_next_upload: bool,
}

impl FrameTarget for RecordingTarget {
    fn upload(&mut self, textures: &TexturePair) -> Result<TextureHandles> {
        if std::mem::take(&mut self.reject_next_upload) {
            bail!("out of texture memory");
        }
        self.uploads
            .push((textures.sharp.dimensions(), textures.cloud.dimensions()));
        self.next += 1;
        let sharp = TextureId(self.next);
        self.next += 1;
        let cloud = TextureId(self.next);
        Ok(TextureHandles { sharp, cloud })
    }

    fn draw(&mut self, handles: TextureHandles, uniforms: Uniforms) -> Result<bool> {
        self.frames.push((handles, uniforms));
        Ok(true)
    }
}

fn renderer(
    dir: &tempfile::TempDir,
    display: (u32, u32),
) -> RenderCoordinator<AtmosphereSource, RecordingTarget> {
    let loader = WallpaperLoader::new(dir.path().join("wallpaper.jpg"), 1440, [0, 0, 255, 255]);
    let options = SynthesisOptions {
        texture_size: 64,
        blur_radius: 6,
        ..SynthesisOptions::default()
    };
    let synth = TextureSynthesizer::with_rng(options, StdRng::seed_from_u64(8));
    RenderCoordinator::new(
        AtmosphereSource::new(loader, synth),
        RecordingTarget::default(),
        SharedRenderState::detached(),
        display,
    )
}

#[test]
fn surface_creation_loads_textures_on_first_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = renderer(&dir, (360, 640));
    r.on_surface_created();
    assert!(r.shared().snapshot().reload_pending);

    let report = r.on_draw_frame().unwrap();
    assert_eq!(report.reload, ReloadOutcome::Reloaded);
    assert!(report.drew);
    assert!(!r.shared().snapshot().reload_pending);
    assert_eq!(r.target().uploads, vec![((360, 640), (64, 64))]);
}

#[test]
fn every_reload_swaps_both_handles() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = renderer(&dir, (100, 100));
    let mut seen = HashSet::new();
    let mut previous: Option<TextureHandles> = None;
    for _ in 0..4 {
        r.request_reload();
        assert_eq!(r.on_frame().unwrap().reload, ReloadOutcome::Reloaded);
        let current = r.handles().unwrap();
        assert!(seen.insert(current.sharp));
        assert!(seen.insert(current.cloud));
        if let Some(prev) = previous {
            assert_ne!(prev.sharp, current.sharp);
            assert_ne!(prev.cloud, current.cloud);
        }
        previous = Some(current);
    }
}

#[test]
fn rejected_upload_keeps_drawing_old_pair() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = renderer(&dir, (100, 100));
    r.on_surface_created();
    r.on_draw_frame().unwrap();
    let active = r.handles().unwrap();

    r.set_blend(0.6);
    r.target_mut().reject_next_upload = true;
    r.request_reload();
    let report = r.on_draw_frame().unwrap();
    assert_eq!(report.reload, ReloadOutcome::NoOp);
    assert!(report.drew);
    assert_eq!(r.handles(), Some(active));
    assert_eq!(r.target().frames.last().unwrap().0, active);
    assert_eq!(report.uniforms.blend, 0.6);
    assert!(r.shared().snapshot().reload_pending);

    // retried on the next frame
    let report = r.on_draw_frame().unwrap();
    assert_eq!(report.reload, ReloadOutcome::Reloaded);
    assert_ne!(r.handles(), Some(active));
    assert_eq!(report.uniforms.blend, 0.6);
}

#[test]
fn resize_rebuilds_at_new_display_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = renderer(&dir, (100, 200));
    r.on_surface_created();
    r.on_draw_frame().unwrap();

    r.on_surface_changed(3000, 1500);
    let report = r.on_draw_frame().unwrap();
    assert_eq!(report.reload, ReloadOutcome::Reloaded);
    assert_eq!(r.target().uploads.last().unwrap().0, (1440, 720));
}

#[test]
fn blend_and_seed_reach_the_draw() {
    let dir = tempfile::tempdir().unwrap();
    let mut r = renderer(&dir, (50, 50));
    r.on_surface_created();
    r.set_blend(2.0);
    r.set_seed(321.5);
    let report = r.on_draw_frame().unwrap();
    assert_eq!(
        report.uniforms,
        Uniforms {
            blend: 1.0,
            seed: 321.5
        }
    );
    let (_, drawn) = *r.target().frames.last().unwrap();
    assert_eq!(drawn, report.uniforms);
}
