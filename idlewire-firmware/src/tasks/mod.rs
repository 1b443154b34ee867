//! Embassy tasks

pub mod heartbeat;
pub mod tick;

pub use heartbeat::heartbeat_task;
pub use tick::{tick_task, TICK_SIGNAL};
