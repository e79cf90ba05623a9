pub mod animator;
pub mod coordinator;
pub mod pipeline;
pub mod state;
pub mod surface;
pub mod viewer;
