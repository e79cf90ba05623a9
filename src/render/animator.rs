//! Lock/unlock driven blend transitions.
//!
//! The curve maths is pure ([`progress`], [`Transition::value_at`]) so any clock
//! can sample it; [`TransitionAnimator`] wires it to a tokio interval that writes
//! the blend factor into the shared render state and asks for a redraw per tick.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::state::SharedRenderState;
use crate::config::{TimingCurve, TransitionOptions};

/// Upper bound (exclusive) of the seed picked for each unlock.
pub const SEED_RANGE: f32 = 1000.0;

/// Normalised progress in [0, 1] after `elapsed` of `duration`.
pub fn progress(elapsed: Duration, duration: Duration, curve: TimingCurve) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    let t = (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32;
    match curve {
        TimingCurve::Linear => t,
        TimingCurve::EaseInOut => t * t * (3.0 - 2.0 * t),
    }
}

/// One timed run of the blend factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub start: f32,
    pub end: f32,
    pub duration: Duration,
    pub curve: TimingCurve,
}

impl Transition {
    pub fn value_at(&self, elapsed: Duration) -> f32 {
        let p = progress(elapsed, self.duration, self.curve);
        if p >= 1.0 {
            return self.end;
        }
        self.start + (self.end - self.start) * p
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

struct ActiveTransition {
    session: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Reacts to lock-state events. At most one transition runs at a time; starting
/// a new one or snapping the blend supersedes it.
pub struct TransitionAnimator<R = StdRng> {
    shared: SharedRenderState,
    options: TransitionOptions,
    rng: R,
    locked: bool,
    active: Option<ActiveTransition>,
}

impl TransitionAnimator<StdRng> {
    pub fn new(shared: SharedRenderState, options: TransitionOptions) -> Self {
        Self::with_rng(shared, options, StdRng::from_os_rng())
    }
}

impl<R: Rng> TransitionAnimator<R> {
    pub fn with_rng(shared: SharedRenderState, options: TransitionOptions, rng: R) -> Self {
        Self {
            shared,
            options,
            rng,
            locked: true,
            active: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_animating(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Screen went off: snap to the ready value without animating.
    pub fn on_lock(&mut self) {
        self.locked = true;
        self.snap(self.options.ready_blend);
    }

    /// Unlock confirmed: new seed, then ramp from the current value to fully clouded.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_unlock(&mut self) {
        self.cancel();
        self.locked = false;
        let seed = self.rng.random::<f32>() * SEED_RANGE;
        let (session, start) = self.shared.begin_session(seed);
        let transition = Transition {
            start,
            end: 1.0,
            duration: self.options.duration,
            curve: self.options.curve,
        };
        debug!(session, start, seed, "starting unlock transition");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(drive(
            self.shared.clone(),
            session,
            transition,
            self.options.tick,
            cancel.clone(),
        ));
        self.active = Some(ActiveTransition {
            session,
            cancel,
            handle,
        });
    }

    /// Returned to the foreground: snap to the value matching the lock state.
    pub fn on_resume(&mut self) {
        let target = if self.locked {
            self.options.ready_blend
        } else {
            1.0
        };
        self.snap(target);
    }

    /// Stop any running transition, leaving the blend where it is.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            trace!(session = active.session, "cancelling transition");
            active.cancel.cancel();
        }
    }

    fn snap(&mut self, blend: f32) {
        self.cancel();
        let session = self.shared.snap(blend);
        debug!(session, blend, "blend snapped");
        self.shared.request_redraw();
    }
}

impl<R> Drop for TransitionAnimator<R> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

async fn drive(
    shared: SharedRenderState,
    session: u64,
    transition: Transition,
    tick: Duration,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let elapsed = started.elapsed();
                if !shared.apply_tick(session, transition.value_at(elapsed)) {
                    break;
                }
                shared.request_redraw();
                if transition.is_finished(elapsed) {
                    trace!(session, "transition finished");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_and_monotonic() {
        let d = Duration::from_secs(3);
        for curve in [TimingCurve::Linear, TimingCurve::EaseInOut] {
            let mut last = 0.0;
            for ms in (0..=4000).step_by(50) {
                let p = progress(Duration::from_millis(ms), d, curve);
                assert!((0.0..=1.0).contains(&p));
                assert!(p >= last);
                last = p;
            }
            assert_eq!(progress(Duration::ZERO, d, curve), 0.0);
            assert_eq!(progress(d, d, curve), 1.0);
        }
    }

    #[test]
    fn zero_duration_completes_immediately() {
        assert_eq!(
            progress(Duration::ZERO, Duration::ZERO, TimingCurve::Linear),
            1.0
        );
    }

    #[test]
    fn transition_maps_into_range() {
        let t = Transition {
            start: 0.4,
            end: 1.0,
            duration: Duration::from_secs(2),
            curve: TimingCurve::Linear,
        };
        assert!((t.value_at(Duration::ZERO) - 0.4).abs() < 1e-6);
        assert!((t.value_at(Duration::from_secs(1)) - 0.7).abs() < 1e-6);
        assert!((t.value_at(Duration::from_secs(5)) - 1.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn lock_snaps_without_animating() {
        let shared = SharedRenderState::detached();
        let mut animator = TransitionAnimator::with_rng(
            shared.clone(),
            TransitionOptions::default(),
            StdRng::seed_from_u64(1),
        );
        animator.on_lock();
        assert!(animator.is_locked());
        assert!(!animator.is_animating());
        assert!((shared.snapshot().blend - 0.4).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn unlock_ramps_to_one_and_sets_seed() {
        let shared = SharedRenderState::detached();
        let mut animator = TransitionAnimator::with_rng(
            shared.clone(),
            TransitionOptions::default(),
            StdRng::seed_from_u64(2),
        );
        animator.on_unlock();
        let seed = shared.snapshot().seed;
        assert!((0.0..SEED_RANGE).contains(&seed));

        tokio::time::sleep(Duration::from_millis(3100)).await;
        let state = shared.snapshot();
        assert_eq!(state.blend, 1.0);
        assert_eq!(state.seed, seed);
        assert!(!animator.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_while_unlocked_snaps_to_one() {
        let shared = SharedRenderState::detached();
        let mut animator = TransitionAnimator::with_rng(
            shared.clone(),
            TransitionOptions::default(),
            StdRng::seed_from_u64(3),
        );
        animator.on_unlock();
        tokio::time::sleep(Duration::from_millis(500)).await;
        animator.on_resume();
        assert_eq!(shared.snapshot().blend, 1.0);
        assert!(!animator.is_animating());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(shared.snapshot().blend, 1.0);
    }
}
