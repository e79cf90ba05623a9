pub mod events;
pub mod watch;
