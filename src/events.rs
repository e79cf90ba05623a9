use std::str::FromStr;

use thiserror::Error;

/// External triggers consumed by the dispatcher. None carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosphereEvent {
    /// Screen went off; prepare the partially clouded look.
    Lock,
    /// Unlock confirmed; run the cloud transition.
    Unlock,
    /// Returned to the foreground.
    Resume,
    /// The stored wallpaper changed; rebuild textures before the next draw.
    ReloadWallpaper,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command `{0}`")]
pub struct UnknownCommand(pub String);

impl FromStr for AtmosphereEvent {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lock" => Ok(Self::Lock),
            "unlock" => Ok(Self::Unlock),
            "resume" => Ok(Self::Resume),
            "reload" => Ok(Self::ReloadWallpaper),
            "quit" | "exit" => Ok(Self::Shutdown),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}
