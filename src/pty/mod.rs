//! In-process PTY panes: child agent processes attached to a virtual
//! terminal, with non-blocking read/write paths feeding the event loop.

mod env;
mod input;
mod pane;
mod screen;

pub use env::sanitized_env;
pub use input::key_to_bytes;
pub use pane::{Pane, SpawnError};
pub use screen::Screen;
