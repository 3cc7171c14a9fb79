//! Shared runtime plumbing: task classes, spawning, and debounce timers.

mod class;
mod debounce;
mod spawn;
mod token;

pub use class::TaskClass;
pub use debounce::Debouncer;
pub use spawn::{spawn, spawn_named_thread};
