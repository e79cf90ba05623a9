pub mod layout;
pub mod pixel_buffer;
pub mod resize;
pub mod stack_blur;
pub mod synth;
pub mod wallpaper;

pub use pixel_buffer::PixelBuffer;
