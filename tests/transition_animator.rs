use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use atmosphere_wallpaper::config::TransitionOptions;
use atmosphere_wallpaper::events::AtmosphereEvent;
use atmosphere_wallpaper::render::animator::TransitionAnimator;
use atmosphere_wallpaper::render::state::SharedRenderState;
use atmosphere_wallpaper::tasks;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(16);

fn counting_state() -> (SharedRenderState, Arc<AtomicUsize>) {
    let redraws = Arc::new(AtomicUsize::new(0));
    let hook = {
        let redraws = Arc::clone(&redraws);
        Arc::new(move || {
            redraws.fetch_add(1, Ordering::SeqCst);
        })
    };
    (SharedRenderState::new(hook), redraws)
}

fn animator(shared: &SharedRenderState, seed: u64) -> TransitionAnimator<StdRng> {
    TransitionAnimator::with_rng(
        shared.clone(),
        TransitionOptions::default(),
        StdRng::seed_from_u64(seed),
    )
}

async fn sample(shared: &SharedRenderState, span: Duration) -> Vec<f32> {
    let mut out = Vec::new();
    let mut waited = Duration::ZERO;
    while waited < span {
        sleep(TICK).await;
        waited += TICK;
        out.push(shared.snapshot().blend);
    }
    out
}

fn assert_non_decreasing(values: &[f32]) {
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "blend went backwards: {pair:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn unlock_ramps_monotonically_to_one() {
    let (shared, redraws) = counting_state();
    let mut animator = animator(&shared, 1);
    animator.on_unlock();
    assert!(animator.is_animating());

    let values = sample(&shared, Duration::from_millis(3500)).await;
    assert_non_decreasing(&values);
    assert!(values[0] < 0.05);
    assert_eq!(*values.last().unwrap(), 1.0);
    assert!(!animator.is_animating());
    assert!(redraws.load(Ordering::SeqCst) > 100);
}

#[tokio::test(start_paused = true)]
async fn lock_then_unlock_starts_from_ready_value() {
    let (shared, redraws) = counting_state();
    let mut animator = animator(&shared, 2);
    animator.on_lock();
    assert_eq!(redraws.load(Ordering::SeqCst), 1);
    assert!((shared.snapshot().blend - 0.4).abs() < 1e-6);

    animator.on_unlock();
    assert!(animator.is_animating());
    let values = sample(&shared, Duration::from_millis(3200)).await;
    assert!(values.iter().all(|v| *v >= 0.4 - 1e-6), "dipped below ready");
    assert!(values[0] < 0.45);
    assert_non_decreasing(&values);
    assert_eq!(*values.last().unwrap(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn fresh_animator_matches_state_seeded_at_ready_value() {
    let options = TransitionOptions::default();
    let shared = SharedRenderState::starting_at(Arc::new(|| {}), options.ready_blend);
    let mut animator = TransitionAnimator::with_rng(
        shared.clone(),
        options.clone(),
        StdRng::seed_from_u64(6),
    );
    assert!(animator.is_locked());
    assert!((shared.snapshot().blend - options.ready_blend).abs() < 1e-6);

    // resuming before any lock event keeps the ready value
    animator.on_resume();
    assert!((shared.snapshot().blend - options.ready_blend).abs() < 1e-6);

    animator.on_unlock();
    let values = sample(&shared, Duration::from_millis(3200)).await;
    assert!(values.iter().all(|v| *v >= options.ready_blend - 1e-6));
    assert_non_decreasing(&values);
    assert_eq!(*values.last().unwrap(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn second_unlock_supersedes_first() {
    let (shared, _) = counting_state();
    let mut animator = animator(&shared, 3);
    animator.on_unlock();
    sleep(Duration::from_millis(1500)).await;
    let first_seed = shared.snapshot().seed;
    let midway = shared.snapshot().blend;
    assert!(midway > 0.3 && midway < 0.7, "midway {midway}");

    animator.on_unlock();
    let second_seed = shared.snapshot().seed;
    assert_ne!(first_seed, second_seed);

    let values = sample(&shared, Duration::from_millis(3200)).await;
    assert!(values[0] >= midway);
    assert_non_decreasing(&values);
    assert_eq!(*values.last().unwrap(), 1.0);
    // the seed is only rewritten when a transition starts
    assert_eq!(shared.snapshot().seed, second_seed);
}

#[tokio::test(start_paused = true)]
async fn lock_mid_transition_stops_the_ramp() {
    let (shared, _) = counting_state();
    let mut animator = animator(&shared, 4);
    animator.on_unlock();
    sleep(Duration::from_millis(2400)).await;
    animator.on_lock();
    assert!(!animator.is_animating());

    let values = sample(&shared, Duration::from_secs(2)).await;
    assert!(values.iter().all(|v| (*v - 0.4).abs() < 1e-6));
}

#[tokio::test(start_paused = true)]
async fn dispatcher_routes_events_until_shutdown() {
    let (shared, _) = counting_state();
    let (tx, rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let dispatcher = tokio::spawn(tasks::events::run(
        rx,
        animator(&shared, 5),
        shared.clone(),
        cancel.clone(),
    ));

    tx.send(AtmosphereEvent::Lock).await.unwrap();
    tx.send(AtmosphereEvent::ReloadWallpaper).await.unwrap();
    sleep(TICK).await;
    let state = shared.snapshot();
    assert!((state.blend - 0.4).abs() < 1e-6);
    assert!(state.reload_pending);

    tx.send(AtmosphereEvent::Unlock).await.unwrap();
    sleep(Duration::from_millis(3100)).await;
    assert_eq!(shared.snapshot().blend, 1.0);

    tx.send(AtmosphereEvent::Resume).await.unwrap();
    tx.send(AtmosphereEvent::Shutdown).await.unwrap();
    dispatcher.await.unwrap().unwrap();
    assert!(cancel.is_cancelled());
    assert_eq!(shared.snapshot().blend, 1.0);
}
