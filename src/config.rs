use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::Error;
use crate::processing::stack_blur::MAX_RADIUS;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// The single fixed-name stored wallpaper image.
    pub wallpaper_path: PathBuf,
    /// Upper bound on the loaded wallpaper width, in pixels.
    pub max_width: u32,
    /// RGB colour of the raster fabricated when no wallpaper can be read.
    pub placeholder_color: [u8; 3],
    /// Reload textures whenever the stored wallpaper file changes.
    pub watch_wallpaper: bool,
    /// Cloud texture synthesis parameters.
    pub synthesis: SynthesisOptions,
    /// Lock/unlock blend transition parameters.
    pub transition: TransitionOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(self.max_width > 0, "max-width must be greater than zero");
        self.synthesis.validate()?;
        self.transition.validate()?;
        Ok(self)
    }

    /// Placeholder colour as an opaque RGBA pixel.
    pub fn placeholder_rgba(&self) -> [u8; 4] {
        let [r, g, b] = self.placeholder_color;
        [r, g, b, 255]
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            wallpaper_path: PathBuf::from("wallpaper.jpg"),
            max_width: 1440,
            placeholder_color: [0, 0, 255],
            watch_wallpaper: true,
            synthesis: SynthesisOptions::default(),
            transition: TransitionOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SynthesisOptions {
    /// Palette grid columns.
    pub grid_cols: u32,
    /// Palette grid rows.
    pub grid_rows: u32,
    /// Edge length of the square cloud texture.
    pub texture_size: u32,
    /// Stack blur radius applied to the painted canvas.
    pub blur_radius: u32,
    /// Fixed RNG seed for zone order and jitter; random when unset.
    pub seed: Option<u64>,
}

impl SynthesisOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.grid_cols > 0 && self.grid_rows > 0,
            "synthesis.grid-cols and synthesis.grid-rows must be greater than zero"
        );
        ensure!(
            self.texture_size > 0,
            "synthesis.texture-size must be greater than zero"
        );
        ensure!(
            self.blur_radius as usize <= MAX_RADIUS,
            "synthesis.blur-radius must be at most {MAX_RADIUS}"
        );
        Ok(())
    }
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            grid_cols: 10,
            grid_rows: 20,
            texture_size: 512,
            blur_radius: 50,
            seed: None,
        }
    }
}

/// Shape of the blend ramp over a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingCurve {
    #[default]
    Linear,
    EaseInOut,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TransitionOptions {
    /// Blend factor snapped to when the screen locks.
    pub ready_blend: f32,
    /// Length of the unlock ramp.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Animation timer period.
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    pub curve: TimingCurve,
}

impl TransitionOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.ready_blend),
            "transition.ready-blend must be within [0, 1]"
        );
        ensure!(
            self.duration > Duration::ZERO,
            "transition.duration must be positive"
        );
        ensure!(self.tick > Duration::ZERO, "transition.tick must be positive");
        Ok(())
    }
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            ready_blend: 0.4,
            duration: Duration::from_secs(3),
            tick: Duration::from_millis(16),
            curve: TimingCurve::Linear,
        }
    }
}
