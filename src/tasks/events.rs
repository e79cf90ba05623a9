use std::io::BufRead;

use anyhow::Result;
use rand::Rng;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::events::AtmosphereEvent;
use crate::render::animator::TransitionAnimator;
use crate::render::state::SharedRenderState;

/// Forward one command per line until EOF or until the dispatcher goes away.
/// Unknown lines are logged and skipped; EOF is not treated as a shutdown request.
///
/// Blocking; run it on a dedicated thread.
pub fn read_commands<R: BufRead>(reader: R, to_dispatch: Sender<AtmosphereEvent>) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<AtmosphereEvent>() {
            Ok(event) => {
                debug!(?event, "command received");
                if to_dispatch.blocking_send(event).is_err() {
                    return Ok(());
                }
            }
            Err(err) => warn!("{err}"),
        }
    }
    debug!("command input closed");
    Ok(())
}

/// SIGUSR1 locks, SIGUSR2 unlocks, SIGHUP reloads the wallpaper.
#[cfg(unix)]
pub async fn listen_signals(
    to_dispatch: Sender<AtmosphereEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;
    let mut sighup = signal(SignalKind::hangup())?;
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            Some(()) = sigusr1.recv() => AtmosphereEvent::Lock,
            Some(()) = sigusr2.recv() => AtmosphereEvent::Unlock,
            Some(()) = sighup.recv() => AtmosphereEvent::ReloadWallpaper,
            else => break,
        };
        info!(?event, "signal received");
        if to_dispatch.send(event).await.is_err() {
            warn!("dispatcher gone; stopping signal listener");
            break;
        }
    }
    Ok(())
}

/// Apply events to the animator and render state until shutdown.
pub async fn run<R: Rng>(
    mut events: Receiver<AtmosphereEvent>,
    mut animator: TransitionAnimator<R>,
    shared: SharedRenderState,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        debug!(?event, "dispatching");
        match event {
            AtmosphereEvent::Lock => animator.on_lock(),
            AtmosphereEvent::Unlock => animator.on_unlock(),
            AtmosphereEvent::Resume => animator.on_resume(),
            AtmosphereEvent::ReloadWallpaper => {
                shared.request_reload();
                shared.request_redraw();
            }
            AtmosphereEvent::Shutdown => {
                info!("shutdown requested");
                cancel.cancel();
                break;
            }
        }
    }
    animator.cancel();
    Ok(())
}
