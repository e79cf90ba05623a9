use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::events::AtmosphereEvent;

/// Emit [`AtmosphereEvent::ReloadWallpaper`] whenever the stored wallpaper is
/// written, replaced, or removed.
#[instrument(skip(to_dispatch, cancel), fields(path = %wallpaper.display()))]
pub async fn run(
    wallpaper: PathBuf,
    to_dispatch: Sender<AtmosphereEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let name = wallpaper
        .file_name()
        .map(|n| n.to_os_string())
        .context("wallpaper path has no file name")?;
    let dir = match wallpaper.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create wallpaper directory {}", dir.display()))?;

    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(32);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(dir = %dir.display(), "watching for wallpaper changes");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(res) = watch_rx.recv() => match res {
                Ok(event) if touches_wallpaper(&event, &name) => {
                    debug!(kind = ?event.kind, "wallpaper changed");
                    if to_dispatch.send(AtmosphereEvent::ReloadWallpaper).await.is_err() {
                        break;
                    }
                }
                Ok(event) => debug!(kind = ?event.kind, paths = ?event.paths, "fs: ignored"),
                Err(err) => error!("watch error: {err}"),
            },
            else => break,
        }
    }
    Ok(())
}

fn touches_wallpaper(event: &Event, name: &OsString) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    );
    relevant && event.paths.iter().any(|p| file_name_is(p, name))
}

fn file_name_is(path: &Path, name: &OsString) -> bool {
    path.file_name().is_some_and(|n| n == name.as_os_str())
}
