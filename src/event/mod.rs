//! Event system: deferred listener registrations, dispatch and bubbling.

pub mod dispatch;
pub mod listener;

pub use dispatch::{bubble_path, Event};
pub use listener::{Callback, Listener, ListenerId, Listeners};
