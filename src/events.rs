//! Event taxonomy and UI modes.
//!
//! Everything that can happen to the application arrives through one queue:
//! input, timer ticks, pane output, and command results. The update step
//! consumes events one at a time; commands run off-thread and post at most
//! one event back.

use crossterm::event::KeyEvent;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::pty::Pane;
use crate::tickets::AgentStatus;

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug)]
pub enum Event {
    /// A key press (only Press kind is forwarded)
    Key(KeyEvent),
    /// Terminal window resized
    Resize(u16, u16),
    /// Status-poll timer fired
    PollTick,
    /// Animation/notification timer fired (every 500 ms)
    AnimationTick,
    /// A pane's read loop produced output; bytes are applied to the pane's
    /// virtual terminal on the update thread
    PaneOutput { session_id: String, bytes: Vec<u8> },
    /// A pane's read loop hit EOF or a read error
    PaneExit {
        session_id: String,
        error: Option<String>,
    },
    /// A close command finished reaping a pane's child
    PaneClosed { session_id: String },
    /// Worktree creation command succeeded
    WorktreeCreated {
        ticket_id: String,
        path: PathBuf,
        branch: String,
        base_branch: String,
    },
    /// A spawn command produced a started pane; the update step adopts it
    SpawnComplete { ticket_id: String, pane: Pane },
    /// Worktree creation or pane spawn failed
    SpawnFailed { ticket_id: String, error: String },
    /// A status-poll command classified the active panes
    StatusReport(Vec<(String, AgentStatus)>),
    /// Generic user-facing notification text
    Notice(String),
}

/// The closed set of input modes. Transitions happen only in the update
/// step; Escape from any non-Normal, non-ShuttingDown mode returns to
/// Normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    /// Reserved; currently routes like Normal
    Insert,
    Command,
    Help,
    Confirm,
    CreateTicket,
    EditTicket,
    AgentView,
    Settings,
    Filter,
    CreateProject,
    Spawning,
    ShuttingDown,
}

impl Mode {
    /// Whether Escape returns to Normal from this mode.
    pub fn escapable(self) -> bool {
        !matches!(self, Mode::Normal | Mode::ShuttingDown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapable_modes() {
        assert!(!Mode::Normal.escapable());
        assert!(!Mode::ShuttingDown.escapable());
        assert!(Mode::Help.escapable());
        assert!(Mode::AgentView.escapable());
        assert!(Mode::Spawning.escapable());
    }
}
