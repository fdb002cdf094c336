//! A single agent pane: child process, PTY pair, and virtual terminal.
//!
//! The pane is owned by the UI model. Background threads only move bytes:
//! the read loop posts raw chunks as events (the update thread feeds them to
//! the screen), and the write loop drains an outgoing queue so the update
//! path never blocks on a full kernel buffer.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{Event, EventSender};
use crate::pty::{sanitized_env, Screen};

/// Grace window between SIGTERM and SIGKILL on close.
const CLOSE_GRACE: Duration = Duration::from_millis(1500);
const READ_BUF_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("agent binary not found: {0}")]
    BinaryNotFound(String),
    #[error("failed to allocate pty: {0}")]
    Pty(String),
    #[error("failed to spawn agent: {0}")]
    Spawn(String),
    #[error("pane has already terminated")]
    Exited,
}

pub struct Pane {
    id: String,
    screen: Screen,
    master: Option<Box<dyn MasterPty + Send>>,
    child: Box<dyn Child + Send + Sync>,
    writer_tx: Option<std_mpsc::Sender<Vec<u8>>>,
    working_dir: PathBuf,
    running: bool,
    closed: bool,
}

impl std::fmt::Debug for Pane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pane")
            .field("id", &self.id)
            .field("running", &self.running)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Pane {
    /// Allocate a PTY, spawn the agent command inside it with a sanitized
    /// environment, and start the read and write loops.
    pub fn start(
        id: &str,
        cols: u16,
        rows: u16,
        working_dir: &Path,
        command: &str,
        args: &[String],
        extra_env: &HashMap<String, String>,
        events_tx: EventSender,
    ) -> Result<Self, SpawnError> {
        which::which(command)
            .map_err(|_| SpawnError::BinaryNotFound(command.to_string()))?;

        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        let pair = native_pty_system()
            .openpty(size)
            .map_err(|e| SpawnError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);
        cmd.cwd(working_dir);
        cmd.env_clear();
        for (key, value) in sanitized_env() {
            cmd.env(key, value);
        }
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SpawnError::Spawn(e.to_string()))?;
        debug!(pane = id, command, pid = ?child.process_id(), "Spawned agent in pane");

        // take_writer can only be called once; the writer thread owns it
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SpawnError::Pty(e.to_string()))?;
        let writer_tx = spawn_write_loop(id.to_string(), writer);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SpawnError::Pty(e.to_string()))?;
        spawn_read_loop(id.to_string(), reader, events_tx);

        Ok(Self {
            id: id.to_string(),
            screen: Screen::new(cols, rows),
            master: Some(pair.master),
            child,
            writer_tx: Some(writer_tx),
            working_dir: working_dir.to_path_buf(),
            running: true,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// True between successful start and the first observed child exit.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Queue bytes for delivery to the child. Never blocks; delivery order
    /// is preserved by the single writer thread.
    pub fn write(&self, bytes: Vec<u8>) -> Result<(), SpawnError> {
        if !self.running {
            return Err(SpawnError::Exited);
        }
        let tx = self.writer_tx.as_ref().ok_or(SpawnError::Exited)?;
        tx.send(bytes).map_err(|_| SpawnError::Exited)
    }

    /// Apply a chunk of PTY output to the virtual terminal. Called from the
    /// update thread when a `PaneOutput` event arrives.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.screen.feed(bytes);
    }

    /// Resize the virtual terminal and push the new winsize to the PTY.
    /// Idempotent.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == self.screen.size() {
            return;
        }
        self.screen.resize(cols, rows);
        if let Some(master) = &self.master {
            let size = PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            };
            if let Err(e) = master.resize(size) {
                warn!(pane = %self.id, error = %e, "PTY resize failed");
            }
        }
    }

    /// Textual rendering of the current screen.
    pub fn snapshot(&self) -> String {
        self.screen.snapshot()
    }

    /// Visible screen rows, for rendering.
    pub fn screen_rows(&self) -> Vec<String> {
        self.screen.rows_text()
    }

    /// The last `n` screen rows, for the status heuristics.
    pub fn tail(&self, n: usize) -> String {
        self.screen.tail(n)
    }

    /// Record the child exit observed by the read loop. Further writes fail.
    pub fn mark_exited(&mut self) {
        self.running = false;
        self.writer_tx = None;
    }

    /// Terminate the child: SIGTERM, a bounded graceful wait, then SIGKILL,
    /// then reap. Idempotent; releases the master fd. Blocks up to the
    /// grace window, so this runs inside a command, never the update step.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.running = false;
        self.writer_tx = None;

        if let Some(pid) = self.child.process_id() {
            debug!(pane = %self.id, pid, "Closing pane");
            let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        let deadline = Instant::now() + CLOSE_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pane = %self.id, ?status, "Pane child exited");
                    break;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(pane = %self.id, "Pane child ignored SIGTERM, killing");
                        let _ = self.child.kill();
                        let _ = self.child.wait();
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!(pane = %self.id, error = %e, "Pane wait failed");
                    break;
                }
            }
        }

        // Dropping the master releases the fd and unblocks the read loop
        self.master = None;
    }
}

/// Writer thread: drains the outgoing queue into the PTY master. A full
/// kernel buffer blocks only this thread; queued bytes are delivered in
/// order once it drains.
fn spawn_write_loop(id: String, mut writer: Box<dyn Write + Send>) -> std_mpsc::Sender<Vec<u8>> {
    let (tx, rx) = std_mpsc::channel::<Vec<u8>>();
    std::thread::Builder::new()
        .name(format!("pane-write-{id}"))
        .spawn(move || {
            while let Ok(bytes) = rx.recv() {
                if writer.write_all(&bytes).and_then(|()| writer.flush()).is_err() {
                    debug!(pane = %id, "Pane writer closed");
                    break;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| warn!(error = %e, "Failed to spawn pane writer thread"));
    tx
}

/// Read loop: blocking reads from the master, posted to the event queue as
/// `PaneOutput`. EOF or error posts `PaneExit` and ends the loop.
fn spawn_read_loop(id: String, mut reader: Box<dyn Read + Send>, events_tx: EventSender) {
    let spawn = std::thread::Builder::new()
        .name(format!("pane-read-{id}"))
        .spawn(move || {
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = events_tx.send(Event::PaneExit {
                            session_id: id.clone(),
                            error: None,
                        });
                        break;
                    }
                    Ok(n) => {
                        let _ = events_tx.send(Event::PaneOutput {
                            session_id: id.clone(),
                            bytes: buf[..n].to_vec(),
                        });
                    }
                    Err(e) => {
                        // EIO is the normal "slave side closed" signal on Linux
                        let error = if e.raw_os_error() == Some(5) {
                            None
                        } else {
                            Some(e.to_string())
                        };
                        let _ = events_tx.send(Event::PaneExit {
                            session_id: id.clone(),
                            error,
                        });
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawn {
        warn!(error = %e, "Failed to spawn pane reader thread");
    }
}
