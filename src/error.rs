use thiserror::Error;

/// Library error type for atmosphere operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A raster was built from a pixel array whose length does not match its dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// A raster was requested with a zero dimension.
    #[error("pixel buffer dimensions must be positive, got {width}x{height}")]
    EmptyBuffer { width: u32, height: u32 },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Image encode/decode error.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
