use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atmosphere_wallpaper::config::Configuration;
use atmosphere_wallpaper::events::AtmosphereEvent;
use atmosphere_wallpaper::processing::synth::TextureSynthesizer;
use atmosphere_wallpaper::processing::wallpaper::{self, WallpaperLoader};
use atmosphere_wallpaper::{render, tasks};
use clap::{ArgAction, Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "atmosphere", version, about = "Cloud-style animated wallpaper")]
struct Args {
    /// Path to YAML config; built-in defaults are used when the file is absent
    #[arg(short, long, value_name = "FILE", default_value = "atmosphere.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the wallpaper window (default)
    Run,
    /// Store an image as the wallpaper
    Set {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Write the sharp and cloud textures as PNGs without opening a window
    Render {
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[arg(long, default_value_t = 1080)]
        width: u32,
        #[arg(long, default_value_t = 1920)]
        height: u32,
    },
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level))
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?)
        .add_directive("naga=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn load_config(path: &Path) -> Result<Configuration> {
    let cfg = if path.exists() {
        let cfg = Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        cfg
    } else {
        tracing::info!("{} not found; using defaults", path.display());
        Configuration::default()
    };
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("{cfg:#?}");
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        verbose,
        command,
    } = Args::parse();
    init_tracing(verbose)?;
    let cfg = load_config(&config)?;

    match command.unwrap_or(Command::Run) {
        Command::Run => run(cfg).await,
        Command::Set { image } => set_wallpaper(&cfg, &image),
        Command::Render { out, width, height } => render_textures(&cfg, &out, width, height),
    }
}

fn set_wallpaper(cfg: &Configuration, image: &Path) -> Result<()> {
    let img = image::open(image)
        .with_context(|| format!("failed to open {}", image.display()))?
        .to_rgba8();
    wallpaper::store(&cfg.wallpaper_path, &img)
        .with_context(|| format!("failed to store {}", cfg.wallpaper_path.display()))?;
    Ok(())
}

fn render_textures(cfg: &Configuration, out: &Path, width: u32, height: u32) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let sharp = WallpaperLoader::from_config(cfg).load(width, height);
    let cloud = TextureSynthesizer::from_options(cfg.synthesis.clone()).synthesize(&sharp);
    for (name, raster) in [("sharp.png", &sharp), ("cloud.png", &cloud)] {
        let path = out.join(name);
        raster
            .to_rgba_image()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote texture");
    }
    Ok(())
}

async fn run(cfg: Configuration) -> Result<()> {
    // Command sources -> dispatcher
    let (events_tx, events_rx) = mpsc::channel::<AtmosphereEvent>(32);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Line commands on stdin; the thread is left detached so a pending read never blocks exit
    {
        let tx = events_tx.clone();
        std::thread::Builder::new()
            .name("stdin-commands".into())
            .spawn(move || {
                if let Err(err) = tasks::events::read_commands(std::io::stdin().lock(), tx) {
                    tracing::warn!("command reader failed: {err:#}");
                }
            })
            .context("failed to spawn command reader")?;
    }

    #[cfg(unix)]
    tasks.spawn({
        let tx = events_tx.clone();
        let cancel = cancel.clone();
        async move {
            tasks::events::listen_signals(tx, cancel)
                .await
                .context("signal listener failed")
        }
    });

    if cfg.watch_wallpaper {
        tasks.spawn({
            let path = cfg.wallpaper_path.clone();
            let tx = events_tx.clone();
            let cancel = cancel.clone();
            async move {
                tasks::watch::run(path, tx, cancel)
                    .await
                    .context("wallpaper watcher failed")
            }
        });
    }

    // The window runs on the main thread and returns when it closes or cancellation occurs
    if let Err(e) = render::viewer::run_windowed(
        cfg,
        events_tx,
        events_rx,
        cancel.clone(),
        &mut tasks,
    )
    .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
