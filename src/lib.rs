pub mod config;
pub mod error;
pub mod events;
pub mod processing;
pub mod render;
pub mod tasks;
