//! Render state shared between the event side and the render thread.
//!
//! [`RenderState`] is a plain value with pure transitions; [`SharedRenderState`]
//! guards one instance behind a mutex and carries the "please redraw" hook. All
//! cross-thread communication goes through it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Blend values closer than this to 0 or 1 count as settled.
const SETTLED_EPSILON: f32 = 1e-3;

/// Callback asking the host surface for one more frame.
pub type RedrawHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sharp,
    Transitioning,
    Blurred,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Cross-fade factor; 0 = sharp wallpaper, 1 = cloud texture.
    pub blend: f32,
    /// Shader seed for spatial variation; rewritten only when an unlock starts.
    pub seed: f32,
    /// Textures must be rebuilt before the next draw.
    pub reload_pending: bool,
    reload_generation: u64,
    session: u64,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            blend: 0.0,
            seed: 0.0,
            reload_pending: false,
            reload_generation: 0,
            session: 0,
        }
    }
}

impl RenderState {
    pub fn phase(&self) -> Phase {
        if self.blend <= SETTLED_EPSILON {
            Phase::Sharp
        } else if self.blend >= 1.0 - SETTLED_EPSILON {
            Phase::Blurred
        } else {
            Phase::Transitioning
        }
    }

    /// Blend clamped into [0, 1]; NaN maps to 0.
    #[must_use]
    pub fn with_blend(self, blend: f32) -> Self {
        let blend = if blend.is_nan() {
            0.0
        } else {
            blend.clamp(0.0, 1.0)
        };
        Self { blend, ..self }
    }

    #[must_use]
    pub fn with_seed(self, seed: f32) -> Self {
        Self { seed, ..self }
    }

    #[must_use]
    pub fn requesting_reload(self) -> Self {
        Self {
            reload_pending: true,
            reload_generation: self.reload_generation.wrapping_add(1),
            ..self
        }
    }

    /// Clears the flag only if no request arrived after `generation` was taken.
    #[must_use]
    pub fn reload_applied(self, generation: u64) -> Self {
        if self.reload_generation == generation {
            Self {
                reload_pending: false,
                ..self
            }
        } else {
            self
        }
    }

    pub fn pending_generation(&self) -> Option<u64> {
        self.reload_pending.then_some(self.reload_generation)
    }

    /// Id of the transition currently allowed to move the blend factor.
    pub fn session(&self) -> u64 {
        self.session
    }

    #[must_use]
    pub fn next_session(self) -> Self {
        Self {
            session: self.session.wrapping_add(1),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct SharedRenderState {
    inner: Arc<Mutex<RenderState>>,
    redraw: RedrawHook,
}

impl fmt::Debug for SharedRenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRenderState")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SharedRenderState {
    pub fn new(redraw: RedrawHook) -> Self {
        Self::starting_at(redraw, 0.0)
    }

    /// State whose first frames show `blend`, e.g. the lock "ready" value.
    pub fn starting_at(redraw: RedrawHook, blend: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RenderState::default().with_blend(blend))),
            redraw,
        }
    }

    /// State whose redraw requests go nowhere (headless use, tests).
    pub fn detached() -> Self {
        Self::new(Arc::new(|| {}))
    }

    fn lock(&self) -> MutexGuard<'_, RenderState> {
        self.inner.lock().expect("render state poisoned")
    }

    fn update(&self, f: impl FnOnce(RenderState) -> RenderState) -> RenderState {
        let mut guard = self.lock();
        *guard = f(*guard);
        *guard
    }

    pub fn snapshot(&self) -> RenderState {
        *self.lock()
    }

    pub fn request_redraw(&self) {
        (self.redraw)();
    }

    /// Mark textures stale. Idempotent; does no GPU work.
    pub fn request_reload(&self) {
        self.update(RenderState::requesting_reload);
    }

    pub fn set_blend(&self, blend: f32) {
        self.update(|s| s.with_blend(blend));
    }

    pub fn set_seed(&self, seed: f32) {
        self.update(|s| s.with_seed(seed));
    }

    pub(crate) fn pending_reload(&self) -> Option<u64> {
        self.lock().pending_generation()
    }

    /// Returns whether the flag was cleared.
    pub(crate) fn finish_reload(&self, generation: u64) -> bool {
        !self.update(|s| s.reload_applied(generation)).reload_pending
    }

    /// Supersede any running transition and set the blend directly.
    pub(crate) fn snap(&self, blend: f32) -> u64 {
        self.update(|s| s.next_session().with_blend(blend)).session
    }

    /// Start a new transition session with a fresh seed. Returns the session id and
    /// the blend value the ramp starts from.
    pub(crate) fn begin_session(&self, seed: f32) -> (u64, f32) {
        let state = self.update(|s| s.next_session().with_seed(seed));
        (state.session, state.blend)
    }

    /// Apply one animation tick; refused once `session` has been superseded.
    pub(crate) fn apply_tick(&self, session: u64, blend: f32) -> bool {
        let mut guard = self.lock();
        if guard.session != session {
            return false;
        }
        *guard = guard.with_blend(blend);
        true
    }
}
