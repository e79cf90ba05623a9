use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

use super::animator::TransitionAnimator;
use super::coordinator::{AtmosphereSource, RenderCoordinator};
use super::pipeline::GpuTexturePipeline;
use super::state::SharedRenderState;
use super::surface::SurfaceRenderer;
use crate::config::Configuration;
use crate::events::AtmosphereEvent;
use crate::processing::synth::TextureSynthesizer;
use crate::processing::wallpaper::WallpaperLoader;
use crate::tasks;

#[derive(Debug)]
enum HostEvent {
    Redraw,
    Cancelled,
}

type Renderer = RenderCoordinator<AtmosphereSource, GpuTexturePipeline>;

struct AtmosphereApp {
    cfg: Configuration,
    cancel: CancellationToken,
    shared: SharedRenderState,
    to_dispatch: Sender<AtmosphereEvent>,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
}

impl AtmosphereApp {
    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default()
            .with_title("Atmosphere")
            .with_fullscreen(Some(Fullscreen::Borderless(None)));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                window.set_cursor_visible(false);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create atmosphere window");
                None
            }
        }
    }

    fn init_renderer(&mut self, window: Arc<Window>) -> Result<()> {
        let pipeline = GpuTexturePipeline::for_window(window)?;
        let display = pipeline.surface_size();
        let source = AtmosphereSource::new(
            WallpaperLoader::from_config(&self.cfg),
            TextureSynthesizer::from_options(self.cfg.synthesis.clone()),
        );
        let mut renderer = RenderCoordinator::new(source, pipeline, self.shared.clone(), display);
        renderer.on_surface_created();
        self.renderer = Some(renderer);
        Ok(())
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match renderer.on_draw_frame() {
            Ok(report) => {
                let phase = renderer.shared().snapshot().phase();
                trace!(?report, ?phase, "frame");
            }
            Err(err) => {
                error!(error = ?err, "frame failed; exiting event loop");
                self.cancel.cancel();
                event_loop.exit();
            }
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<HostEvent> for AtmosphereApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.renderer.is_none() {
            if let Err(err) = self.init_renderer(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("atmosphere window close requested");
                self.cancel.cancel();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.on_surface_changed(size.width, size.height);
                }
                self.request_redraw();
            }
            WindowEvent::Focused(true) => {
                if let Err(err) = self.to_dispatch.try_send(AtmosphereEvent::Resume) {
                    warn!("failed to forward resume: {err}");
                }
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Redraw => self.request_redraw(),
            HostEvent::Cancelled => {
                info!("atmosphere received cancellation event");
                event_loop.exit();
            }
        }
    }
}

/// Run the wallpaper window on the calling thread until it closes or `cancel` fires.
///
/// The event dispatcher is spawned into `background`; it owns the transition animator
/// and wakes the window through the shared render state.
pub fn run_windowed(
    cfg: Configuration,
    to_dispatch: Sender<AtmosphereEvent>,
    from_sources: Receiver<AtmosphereEvent>,
    cancel: CancellationToken,
    background: &mut JoinSet<Result<()>>,
) -> Result<()> {
    let event_loop = EventLoop::<HostEvent>::with_user_event()
        .build()
        .context("failed to build atmosphere event loop")?;

    let redraw_proxy = Mutex::new(event_loop.create_proxy());
    // The animator starts locked, so the first frames show the ready value.
    let shared = SharedRenderState::starting_at(
        Arc::new(move || {
            if let Ok(proxy) = redraw_proxy.lock() {
                let _ = proxy.send_event(HostEvent::Redraw);
            }
        }),
        cfg.transition.ready_blend,
    );

    background.spawn({
        let animator = TransitionAnimator::new(shared.clone(), cfg.transition.clone());
        let shared = shared.clone();
        let cancel = cancel.clone();
        async move {
            tasks::events::run(from_sources, animator, shared, cancel)
                .await
                .context("dispatcher task failed")
        }
    });

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(HostEvent::Cancelled);
        })
    };

    let mut app = AtmosphereApp {
        cfg,
        cancel,
        shared,
        to_dispatch,
        window: None,
        renderer: None,
    };
    debug!("starting atmosphere event loop");
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("atmosphere event loop failed")
}
