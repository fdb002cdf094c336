//! The UI core: model, update, view, and the command boundary.
//!
//! One event queue feeds a single-threaded update loop. Anything that could
//! block (git, process spawn, process reaping, status classification) runs
//! as a command on a worker and posts at most one event back. All model
//! mutation happens here, in the update step.

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::agents::{
    build_invocation, classify_all, render_init_prompt, ClassifierInput, PromptContext,
    StatusCache, StatusFiles,
};
use crate::config::Config;
use crate::events::{Event, EventSender, Mode};
use crate::git::{WorktreeError, WorktreeManager};
use crate::pty::{key_to_bytes, Pane};
use crate::store::{Project, ProjectRegistry, TicketStore};
use crate::tickets::{AgentStatus, Board, Ticket, TicketStatus};
use crate::ui::{
    self, BoardContext, ColumnData, ConfirmAction, ConfirmDialog, FormOutcome, ProjectForm,
    SettingsOutcome, SettingsView, SidebarData, Theme, TicketForm,
};

/// How long a notification stays on the status bar.
const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Number of screen rows the status heuristics inspect.
const STATUS_TAIL_ROWS: usize = 10;

pub struct App {
    pub config: Config,
    pub theme: Theme,
    pub board: Board,
    pub registry: ProjectRegistry,
    ticket_store: TicketStore,
    pub mode: Mode,

    /// Panes keyed by session id; entries exist only between successful
    /// spawn and reaping
    pub panes: HashMap<String, Pane>,
    status_cache: Arc<StatusCache>,
    status_files: StatusFiles,
    events_tx: EventSender,

    // Cursor
    pub selected_column: usize,
    selected_rows: [usize; 3],

    // Filter
    pub filter_query: String,

    // Project sidebar
    pub sidebar_visible: bool,
    pub sidebar_cursor: usize,
    pub active_project: Option<String>,

    // Overlays and transient state
    pub confirm: ConfirmDialog,
    pub ticket_form: Option<TicketForm>,
    pub project_form: Option<ProjectForm>,
    pub settings: SettingsView,
    pub command_line: String,

    /// Ticket attached in AgentView
    pub attached: Option<String>,
    /// Ticket currently going through the spawn contract
    spawning_ticket: Option<String>,

    notifications: VecDeque<(String, Instant)>,
    anim_frame: u8,

    /// Session ids whose close we are waiting on during shutdown
    shutdown_pending: HashSet<String>,
    pub should_quit: bool,

    term_cols: u16,
    term_rows: u16,
}

impl App {
    pub fn new(config: Config, events_tx: EventSender) -> Result<Self> {
        let data_dir = config.data_path();
        let registry = ProjectRegistry::load(&data_dir).context("Failed to load projects")?;
        let ticket_store = TicketStore::new(&data_dir);

        let mut board = Board::new();
        for project in registry.all() {
            let tickets = ticket_store
                .load(&project.id)
                .with_context(|| format!("Failed to load tickets for {}", project.name))?;
            for mut ticket in tickets {
                // Stored runtime state never survives a restart
                ticket.session_id = None;
                ticket.agent_status = AgentStatus::None;
                board.insert(ticket);
            }
        }
        info!(
            projects = registry.all().len(),
            tickets = board.tickets.len(),
            "Loaded board"
        );

        let theme = Theme::load(&config.ui.theme, &config.ui.colors);
        let (term_cols, term_rows) = crossterm::terminal::size().unwrap_or((80, 24));

        Ok(Self {
            theme,
            board,
            registry,
            ticket_store,
            mode: Mode::Normal,
            panes: HashMap::new(),
            status_cache: Arc::new(StatusCache::new()),
            status_files: StatusFiles::new(),
            events_tx,
            selected_column: 0,
            selected_rows: [0; 3],
            filter_query: String::new(),
            sidebar_visible: false,
            sidebar_cursor: 0,
            active_project: None,
            confirm: ConfirmDialog::default(),
            ticket_form: None,
            project_form: None,
            settings: SettingsView::new(),
            command_line: String::new(),
            attached: None,
            spawning_ticket: None,
            notifications: VecDeque::new(),
            anim_frame: 0,
            shutdown_pending: HashSet::new(),
            should_quit: false,
            term_cols,
            term_rows,
            config,
        })
    }

    // ─── Update ──────────────────────────────────────────────────────────

    pub fn update(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize(cols, rows) => {
                self.term_cols = cols;
                self.term_rows = rows;
                let (pane_cols, pane_rows) = self.pane_size();
                for pane in self.panes.values_mut() {
                    pane.resize(pane_cols, pane_rows);
                }
            }
            Event::PollTick => self.start_status_poll(),
            Event::AnimationTick => {
                self.anim_frame = (self.anim_frame + 1) % 4;
                self.expire_notifications();
            }
            Event::PaneOutput { session_id, bytes } => {
                // Screen changed: the cached classification is stale
                if let Some(pane) = self.panes.get_mut(&session_id) {
                    pane.feed(&bytes);
                    self.status_cache.invalidate(&session_id);
                }
            }
            Event::PaneExit { session_id, error } => self.on_pane_exit(&session_id, error),
            Event::PaneClosed { session_id } => {
                if self.mode == Mode::ShuttingDown {
                    self.shutdown_pending.remove(&session_id);
                    if self.shutdown_pending.is_empty() {
                        self.should_quit = true;
                    }
                }
            }
            Event::WorktreeCreated {
                ticket_id,
                path,
                branch,
                base_branch,
            } => self.on_worktree_created(&ticket_id, path, branch, base_branch),
            Event::SpawnComplete { ticket_id, pane } => self.on_spawn_complete(&ticket_id, pane),
            Event::SpawnFailed { ticket_id, error } => {
                warn!(ticket = %ticket_id, %error, "Spawn failed");
                if self.spawning_ticket.as_deref() == Some(ticket_id.as_str()) {
                    self.spawning_ticket = None;
                    if self.mode == Mode::Spawning {
                        self.mode = Mode::Normal;
                    }
                }
                self.notify(format!("Spawn failed: {error}"));
            }
            Event::StatusReport(statuses) => {
                for (ticket_id, status) in statuses {
                    // Tolerate reports for tickets that disappeared mid-flight
                    if let Some(ticket) = self.board.get_mut(&ticket_id) {
                        if ticket.session_id.is_some() {
                            ticket.agent_status = status;
                        }
                    }
                }
            }
            Event::Notice(text) => self.notify(text),
        }
    }

    // ─── Key routing ─────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) {
        if self.mode == Mode::ShuttingDown {
            return;
        }

        // Global: Escape closes any overlay and returns to Normal
        if key.code == KeyCode::Esc && self.mode.escapable() {
            self.leave_mode();
            return;
        }

        // Global: help toggle, except while text is being entered
        if key.code == KeyCode::Char('?') && matches!(self.mode, Mode::Normal | Mode::Help) {
            self.mode = if self.mode == Mode::Help {
                Mode::Normal
            } else {
                Mode::Help
            };
            return;
        }

        match self.mode {
            // Insert is a reserved placeholder and routes like Normal
            Mode::Normal | Mode::Insert => self.handle_normal_key(key),
            Mode::Help => self.mode = Mode::Normal,
            Mode::Confirm => self.handle_confirm_key(key),
            Mode::Command => self.handle_command_key(key),
            Mode::Filter => self.handle_filter_key(key),
            Mode::CreateTicket | Mode::EditTicket => self.handle_ticket_form_key(key),
            Mode::CreateProject => self.handle_project_form_key(key),
            Mode::Settings => self.handle_settings_key(key),
            Mode::AgentView => self.handle_agent_view_key(key),
            Mode::Spawning => {} // only Esc, handled above
            Mode::ShuttingDown => {}
        }
    }

    /// Escape path out of the current mode.
    fn leave_mode(&mut self) {
        match self.mode {
            Mode::Filter => self.filter_query.clear(),
            Mode::Confirm => self.confirm.clear(),
            Mode::CreateTicket | Mode::EditTicket => self.ticket_form = None,
            Mode::CreateProject => self.project_form = None,
            Mode::AgentView => self.attached = None,
            Mode::Spawning => {
                // Abort the transition; an in-flight worktree command keeps
                // running and its result is dropped on arrival
                self.spawning_ticket = None;
            }
            _ => {}
        }
        self.command_line.clear();
        self.mode = Mode::Normal;
        self.clamp_cursor();
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        // Ctrl+C quits from Normal; in AgentView it reaches the agent instead
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.begin_shutdown();
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.begin_shutdown(),
            KeyCode::Char('h') | KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.clamp_cursor();
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.selected_column = (self.selected_column + 1).min(2);
                self.clamp_cursor();
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_row(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_row(-1),
            KeyCode::Char('g') => self.selected_rows[self.selected_column] = 0,
            KeyCode::Char('G') => {
                let len = self.visible_column(self.column_status()).len();
                self.selected_rows[self.selected_column] = len.saturating_sub(1);
            }
            KeyCode::Char('n') => self.open_create_form(),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') => self.arm_delete(),
            KeyCode::Char(' ') => self.move_ticket(true),
            KeyCode::Char('-') => self.move_ticket(false),
            KeyCode::Char('s') => self.spawn_agent(),
            KeyCode::Char('S') => self.stop_agent(),
            KeyCode::Enter => self.attach(),
            KeyCode::Char('/') => self.mode = Mode::Filter,
            KeyCode::Char(':') => {
                self.command_line.clear();
                self.mode = Mode::Command;
            }
            KeyCode::Char('O') => self.mode = Mode::Settings,
            KeyCode::Char('[') => {
                self.sidebar_visible = !self.sidebar_visible;
            }
            KeyCode::Char('p') => {
                self.project_form = Some(ProjectForm::new());
                self.mode = Mode::CreateProject;
            }
            KeyCode::Tab if self.sidebar_visible => self.cycle_sidebar(),
            _ => {}
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let action = self.confirm.take();
                self.mode = Mode::Normal;
                if let Some(ConfirmAction::DeleteTicket { ticket_id }) = action {
                    self.delete_ticket(&ticket_id);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.confirm.clear();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.command_line);
                self.mode = Mode::Normal;
                self.run_command(line.trim());
            }
            KeyCode::Backspace => {
                self.command_line.pop();
            }
            KeyCode::Char(c) => self.command_line.push(c),
            _ => {}
        }
    }

    fn run_command(&mut self, command: &str) {
        match command {
            "" => {}
            "q" | "quit" => self.begin_shutdown(),
            "w" | "write" => {
                self.save_all();
                self.notify("Saved".to_string());
            }
            "help" => self.mode = Mode::Help,
            other => self.notify(format!("Unknown command: {other}")),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.clamp_cursor();
            }
            KeyCode::Backspace => {
                self.filter_query.pop();
                self.clamp_cursor();
            }
            KeyCode::Char(c) => {
                self.filter_query.push(c);
                self.clamp_cursor();
            }
            _ => {}
        }
    }

    fn handle_ticket_form_key(&mut self, key: KeyEvent) {
        let Some(mut form) = self.ticket_form.take() else {
            self.mode = Mode::Normal;
            return;
        };
        match form.handle_key(key) {
            FormOutcome::Cancelled => {
                self.mode = Mode::Normal;
            }
            FormOutcome::Submitted => match form.result() {
                Ok(result) => {
                    let editing = form.editing.clone();
                    if let Some(err) = self.apply_ticket_form(editing, result) {
                        form.error = Some(err);
                        self.ticket_form = Some(form);
                    } else {
                        self.mode = Mode::Normal;
                    }
                }
                Err(message) => {
                    form.error = Some(message);
                    self.ticket_form = Some(form);
                }
            },
            FormOutcome::Consumed => {
                self.ticket_form = Some(form);
            }
        }
    }

    fn handle_project_form_key(&mut self, key: KeyEvent) {
        let Some(mut form) = self.project_form.take() else {
            self.mode = Mode::Normal;
            return;
        };
        match form.handle_key(key) {
            FormOutcome::Cancelled => {
                self.mode = Mode::Normal;
            }
            FormOutcome::Submitted => match form.result() {
                Ok((name, path)) => {
                    let project = Project::new(&name, std::path::Path::new(&path));
                    if let Err(e) = self.registry.add(project) {
                        self.notify(format!("Failed to save project: {e}"));
                    } else {
                        self.notify(format!("Project '{name}' added"));
                    }
                    self.mode = Mode::Normal;
                }
                Err(message) => {
                    form.error = Some(message);
                    self.project_form = Some(form);
                }
            },
            FormOutcome::Consumed => {
                self.project_form = Some(form);
            }
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match self.settings.handle_key(key, &mut self.config) {
            SettingsOutcome::Closed => self.mode = Mode::Normal,
            SettingsOutcome::Changed => {
                self.theme = Theme::load(&self.config.ui.theme, &self.config.ui.colors);
                if let Err(e) = self.config.save() {
                    self.notify(format!("Failed to save config: {e}"));
                }
            }
            SettingsOutcome::Consumed => {}
        }
    }

    fn handle_agent_view_key(&mut self, key: KeyEvent) {
        let Some(session_id) = self
            .attached
            .as_ref()
            .and_then(|tid| self.board.get(tid))
            .and_then(|t| t.session_id.clone())
        else {
            self.attached = None;
            self.mode = Mode::Normal;
            return;
        };
        let Some(bytes) = key_to_bytes(&key) else {
            return;
        };
        if let Some(pane) = self.panes.get(&session_id) {
            if let Err(e) = pane.write(bytes) {
                self.notify(format!("Pane write failed: {e}"));
            }
        }
    }

    // ─── Cursor and filtering ────────────────────────────────────────────

    fn column_status(&self) -> TicketStatus {
        TicketStatus::all()[self.selected_column]
    }

    fn move_row(&mut self, delta: isize) {
        let len = self.visible_column(self.column_status()).len();
        if len == 0 {
            return;
        }
        let row = &mut self.selected_rows[self.selected_column];
        let next = row.saturating_add_signed(delta);
        *row = next.min(len - 1);
    }

    fn clamp_cursor(&mut self) {
        for (i, status) in TicketStatus::all().iter().enumerate() {
            let len = self.visible_column(*status).len();
            self.selected_rows[i] = self.selected_rows[i].min(len.saturating_sub(1));
        }
    }

    /// Tickets of a column after the sidebar and filter query are applied.
    fn visible_column(&self, status: TicketStatus) -> Vec<&Ticket> {
        let (project_names, text) = parse_filter(&self.filter_query);
        self.board
            .column(status)
            .into_iter()
            .filter(|t| self.ticket_visible(t, &project_names, &text))
            .collect()
    }

    fn ticket_visible(&self, ticket: &Ticket, project_names: &[String], text: &str) -> bool {
        if let Some(ref active) = self.active_project {
            if ticket.project_id != *active {
                return false;
            }
        }
        if !project_names.is_empty() {
            let name = self
                .registry
                .get(&ticket.project_id)
                .map(|p| p.name.to_lowercase());
            let matched = name.is_some_and(|name| {
                project_names.iter().any(|wanted| name.contains(wanted))
            });
            if !matched {
                return false;
            }
        }
        if !text.is_empty() && !ticket.title.to_lowercase().contains(text) {
            return false;
        }
        true
    }

    fn selected_ticket_id(&self) -> Option<String> {
        let column = self.visible_column(self.column_status());
        column
            .get(self.selected_rows[self.selected_column])
            .map(|t| t.id.clone())
    }

    fn cycle_sidebar(&mut self) {
        let count = self.registry.all().len() + 1; // plus "All projects"
        self.sidebar_cursor = (self.sidebar_cursor + 1) % count;
        self.active_project = if self.sidebar_cursor == 0 {
            None
        } else {
            self.registry
                .all()
                .get(self.sidebar_cursor - 1)
                .map(|p| p.id.clone())
        };
        self.clamp_cursor();
    }

    // ─── Ticket CRUD ─────────────────────────────────────────────────────

    fn open_create_form(&mut self) {
        if self.registry.is_empty() {
            self.notify("Register a project first (press p)".to_string());
            return;
        }
        self.ticket_form = Some(TicketForm::create(self.agent_names()));
        self.mode = Mode::CreateTicket;
    }

    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_ticket_id() else {
            return;
        };
        if let Some(ticket) = self.board.get(&id) {
            self.ticket_form = Some(TicketForm::edit(ticket, self.agent_names()));
            self.mode = Mode::EditTicket;
        }
    }

    fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.agents.map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply a submitted ticket form. Returns an error message to surface in
    /// the form when the edit is rejected.
    fn apply_ticket_form(
        &mut self,
        editing: Option<String>,
        result: ui::TicketFormResult,
    ) -> Option<String> {
        match editing {
            Some(ticket_id) => {
                // Cycle check happens against the rest of the board first
                for blocker in &result.blocked_by {
                    let already = self
                        .board
                        .get(&ticket_id)
                        .is_some_and(|t| t.blocked_by.contains(blocker));
                    if !already && self.board.would_cycle(&ticket_id, blocker) {
                        return Some(format!("Blocking on {blocker} would create a cycle"));
                    }
                }
                let Some(ticket) = self.board.get_mut(&ticket_id) else {
                    return Some("Ticket no longer exists".to_string());
                };
                // A carved-out worktree locks the branch name
                if ticket.branch_locked() && result.branch_name != ticket.branch_name {
                    return Some("Branch is locked while its worktree exists".to_string());
                }
                ticket.title = result.title;
                ticket.description = result.description;
                ticket.priority = result.priority.clamp(1, 5);
                ticket.agent_type = result.agent_type;
                ticket.labels = result.labels;
                ticket.blocked_by = result.blocked_by;
                if !ticket.branch_locked() {
                    ticket.branch_name = result.branch_name;
                }
                ticket.touch();
                let project_id = ticket.project_id.clone();
                self.save_project(&project_id);
                None
            }
            None => {
                let project_id = self
                    .active_project
                    .clone()
                    .or_else(|| self.registry.all().first().map(|p| p.id.clone()));
                let Some(project_id) = project_id else {
                    return Some("No project to create the ticket in".to_string());
                };
                let mut ticket = Ticket::new(&project_id, &result.title, &result.description);
                ticket.priority = result.priority.clamp(1, 5);
                ticket.agent_type = result.agent_type;
                ticket.labels = result.labels;
                ticket.blocked_by = result.blocked_by;
                ticket.branch_name = result.branch_name;
                self.board.insert(ticket);
                self.save_project(&project_id);
                None
            }
        }
    }

    fn arm_delete(&mut self) {
        let Some(id) = self.selected_ticket_id() else {
            return;
        };
        if let Some(ticket) = self.board.get(&id) {
            self.confirm.arm(
                &format!("Delete '{}'?", ticket.title),
                ConfirmAction::DeleteTicket { ticket_id: id },
            );
            self.mode = Mode::Confirm;
        }
    }

    fn delete_ticket(&mut self, ticket_id: &str) {
        // Destroy the pane before the ticket record goes away
        if let Some(session_id) = self
            .board
            .get(ticket_id)
            .and_then(|t| t.session_id.clone())
        {
            self.close_pane(&session_id);
        }

        let Some(ticket) = self.board.remove(ticket_id) else {
            return;
        };
        if self.attached.as_deref() == Some(ticket_id) {
            self.attached = None;
        }

        if self.config.git.remove_worktree_on_delete {
            if let (Some(path), Some(project)) =
                (ticket.worktree_path.clone(), self.registry.get(&ticket.project_id))
            {
                let repo = project.repo_path.clone();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    WorktreeManager::new(&repo).remove_worktree(&path).await;
                    let _ = tx.send(Event::Notice("Worktree removed".to_string()));
                });
            }
        }

        self.save_project(&ticket.project_id);
        self.clamp_cursor();
        self.notify(format!("Deleted '{}'", ticket.title));
    }

    fn move_ticket(&mut self, forward: bool) {
        let Some(id) = self.selected_ticket_id() else {
            return;
        };
        let Some(ticket) = self.board.get_mut(&id) else {
            return;
        };
        let next = if forward {
            ticket.status.next()
        } else {
            ticket.status.prev()
        };
        let Some(next) = next else {
            return; // Done is terminal forward; Backlog backward
        };
        ticket.status = next;
        ticket.touch();
        let project_id = ticket.project_id.clone();
        self.save_project(&project_id);
        self.clamp_cursor();
    }

    // ─── Spawn contract ──────────────────────────────────────────────────

    fn spawn_agent(&mut self) {
        let Some(ticket_id) = self.selected_ticket_id() else {
            return;
        };
        let Some(ticket) = self.board.get(&ticket_id) else {
            return;
        };
        let status = ticket.status;
        let running = ticket
            .session_id
            .as_ref()
            .and_then(|sid| self.panes.get(sid))
            .is_some_and(Pane::running);
        let repo = self
            .registry
            .get(&ticket.project_id)
            .map(|p| p.repo_path.clone());
        let agent_known = self.config.agent_for(&ticket.agent_type).is_some();
        let agent_type = ticket.agent_type.clone();
        let has_worktree = ticket.worktree_path.is_some();
        let short_id = ticket.short_id().to_string();

        if status != TicketStatus::InProgress {
            self.notify("Spawn requires the ticket to be In Progress".to_string());
            return;
        }
        if running {
            self.notify("Agent is already running".to_string());
            return;
        }
        let Some(repo) = repo else {
            self.notify("Ticket's project is not registered".to_string());
            return;
        };
        if !agent_known {
            self.notify(format!("No agent named '{agent_type}' configured"));
            return;
        }

        self.spawning_ticket = Some(ticket_id.clone());
        self.mode = Mode::Spawning;

        if has_worktree {
            // Worktree already resolved on a previous spawn
            self.start_agent_pane(&ticket_id);
            return;
        }

        let branch = format!("{}{}", self.config.git.branch_prefix, short_id);
        let tx = self.events_tx.clone();
        let ticket_id_for_cmd = ticket_id.clone();

        tokio::spawn(async move {
            let manager = WorktreeManager::new(&repo);
            let result = async {
                let base = manager.default_branch().await?;
                let path = match manager.create_worktree(&branch, &base).await {
                    // A worktree left behind by an aborted spawn is reused
                    Err(WorktreeError::WorktreeExists(path)) => path,
                    other => other?,
                };
                Ok::<_, WorktreeError>((path, base))
            }
            .await;

            let event = match result {
                Ok((path, base_branch)) => Event::WorktreeCreated {
                    ticket_id: ticket_id_for_cmd,
                    path,
                    branch,
                    base_branch,
                },
                Err(e) => Event::SpawnFailed {
                    ticket_id: ticket_id_for_cmd,
                    error: e.to_string(),
                },
            };
            let _ = tx.send(event);
        });
    }

    fn on_worktree_created(
        &mut self,
        ticket_id: &str,
        path: PathBuf,
        branch: String,
        base_branch: String,
    ) {
        if self.spawning_ticket.as_deref() != Some(ticket_id) {
            // Escaped out of Spawning, or the ticket was deleted: drop it
            debug!(ticket = %ticket_id, "Dropping worktree result for aborted spawn");
            return;
        }
        let Some(ticket) = self.board.get_mut(ticket_id) else {
            self.spawning_ticket = None;
            self.mode = Mode::Normal;
            return;
        };
        ticket.worktree_path = Some(path);
        ticket.branch_name = Some(branch);
        ticket.base_branch = Some(base_branch);
        ticket.touch();
        let project_id = ticket.project_id.clone();
        self.save_project(&project_id);

        self.start_agent_pane(ticket_id);
    }

    /// Issue the pane-spawn command for a ticket whose worktree is resolved.
    fn start_agent_pane(&mut self, ticket_id: &str) {
        let Some(ticket) = self.board.get(ticket_id) else {
            return;
        };
        let Some(worktree) = ticket.worktree_path.clone() else {
            self.notify("Ticket has no worktree".to_string());
            return;
        };
        let Some((agent_name, agent)) = self.config.agent_for(&ticket.agent_type) else {
            self.notify("Agent configuration missing".to_string());
            return;
        };

        let context = PromptContext {
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            branch_name: ticket.branch_name.clone().unwrap_or_default(),
            base_branch: ticket.base_branch.clone().unwrap_or_default(),
        };
        let prompt = match render_init_prompt(&agent.init_prompt_template, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                self.spawning_ticket = None;
                self.mode = Mode::Normal;
                self.notify(format!("Prompt template failed: {e}"));
                return;
            }
        };

        let resume = ticket.agent_spawned_at.is_some();
        let (command, args) = build_invocation(agent, &prompt, resume);
        let session_id = format!(
            "{}{}",
            self.config.agents.session_prefix,
            ticket.short_id()
        );
        let extra_env = agent.env.clone();
        let (cols, rows) = self.pane_size();
        let tx = self.events_tx.clone();
        let ticket_id = ticket_id.to_string();
        debug!(agent = agent_name, %command, session = %session_id, "Spawning agent pane");

        tokio::task::spawn_blocking(move || {
            let result = Pane::start(
                &session_id,
                cols,
                rows,
                &worktree,
                &command,
                &args,
                &extra_env,
                tx.clone(),
            );
            let event = match result {
                Ok(pane) => Event::SpawnComplete { ticket_id, pane },
                Err(e) => Event::SpawnFailed {
                    ticket_id,
                    error: e.to_string(),
                },
            };
            let _ = tx.send(event);
        });
    }

    fn on_spawn_complete(&mut self, ticket_id: &str, pane: Pane) {
        let Some(ticket) = self.board.get_mut(ticket_id) else {
            // Ticket vanished while the command ran: reap the orphan pane
            let mut pane = pane;
            tokio::task::spawn_blocking(move || pane.close());
            return;
        };

        let session_id = pane.id().to_string();
        ticket.session_id = Some(session_id.clone());
        ticket.agent_spawned_at = Some(Utc::now());
        ticket.agent_status = AgentStatus::Working;
        ticket.touch();
        let project_id = ticket.project_id.clone();
        self.panes.insert(session_id, pane);
        self.save_project(&project_id);

        let focus = self.spawning_ticket.as_deref() == Some(ticket_id);
        self.spawning_ticket = None;
        if focus {
            self.attached = Some(ticket_id.to_string());
            self.mode = Mode::AgentView;
        }
        info!(ticket = %ticket_id, "Agent spawned");
    }

    // ─── Stop / exit / shutdown ──────────────────────────────────────────

    fn stop_agent(&mut self) {
        let Some(ticket_id) = self.selected_ticket_id() else {
            return;
        };
        let Some(ticket) = self.board.get_mut(&ticket_id) else {
            return;
        };
        let Some(session_id) = ticket.session_id.take() else {
            self.notify("No agent to stop".to_string());
            return;
        };

        let final_status = ticket.agent_status;
        ticket.agent_status = AgentStatus::None;
        ticket.touch();
        let project_id = ticket.project_id.clone();

        self.close_pane(&session_id);
        self.status_files.write(&session_id, final_status);
        self.save_project(&project_id);
        self.notify("Agent stopped".to_string());
    }

    /// Remove a pane from the map and reap it on a worker.
    fn close_pane(&mut self, session_id: &str) {
        self.status_cache.invalidate(session_id);
        if let Some(mut pane) = self.panes.remove(session_id) {
            let tx = self.events_tx.clone();
            let session_id = session_id.to_string();
            tokio::task::spawn_blocking(move || {
                pane.close();
                let _ = tx.send(Event::PaneClosed { session_id });
            });
        }
    }

    fn on_pane_exit(&mut self, session_id: &str, error: Option<String>) {
        let Some(pane) = self.panes.get_mut(session_id) else {
            return; // already closed and removed
        };
        pane.mark_exited();

        // Reap the child and drop the pane entry together with the ticket's
        // session reference
        self.close_pane(session_id);

        let ticket = self
            .board
            .tickets
            .values_mut()
            .find(|t| t.session_id.as_deref() == Some(session_id));
        if let Some(ticket) = ticket {
            ticket.session_id = None;
            ticket.agent_status = AgentStatus::None;
            let title = ticket.title.clone();
            if self.attached.as_deref() == Some(ticket.id.as_str()) {
                self.attached = None;
                if self.mode == Mode::AgentView {
                    self.mode = Mode::Normal;
                }
            }
            match error {
                Some(e) => self.notify(format!("Agent for '{title}' failed: {e}")),
                None => self.notify(format!("Agent for '{title}' exited")),
            }
        }
    }

    fn begin_shutdown(&mut self) {
        if self.mode == Mode::ShuttingDown {
            return;
        }
        info!(panes = self.panes.len(), "Shutting down");
        self.mode = Mode::ShuttingDown;

        let session_ids: Vec<String> = self.panes.keys().cloned().collect();
        for ticket in self.board.tickets.values_mut() {
            ticket.session_id = None;
            ticket.agent_status = AgentStatus::None;
        }
        for session_id in session_ids {
            self.shutdown_pending.insert(session_id.clone());
            self.close_pane(&session_id);
        }
        if self.shutdown_pending.is_empty() {
            self.should_quit = true;
        }
    }

    // ─── Status polling ──────────────────────────────────────────────────

    fn start_status_poll(&mut self) {
        let inputs: Vec<ClassifierInput> = self
            .board
            .all()
            .filter_map(|ticket| {
                let session_id = ticket.session_id.clone()?;
                let pane = self.panes.get(&session_id)?;
                let agent_relpath = self
                    .config
                    .agent_for(&ticket.agent_type)
                    .and_then(|(_, a)| a.status_file.clone());
                Some(ClassifierInput {
                    ticket_id: ticket.id.clone(),
                    session_id,
                    running: pane.running(),
                    tail: pane.tail(STATUS_TAIL_ROWS),
                    agent_relpath,
                })
            })
            .collect();
        if inputs.is_empty() {
            return;
        }

        let cache = Arc::clone(&self.status_cache);
        let files = self.status_files.clone();
        let tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let statuses = classify_all(&cache, &files, &inputs);
            let _ = tx.send(Event::StatusReport(statuses));
        });
    }

    // ─── Notifications and persistence ───────────────────────────────────

    fn notify(&mut self, text: String) {
        debug!(%text, "Notification");
        self.notifications.push_back((text, Instant::now()));
    }

    fn expire_notifications(&mut self) {
        while let Some((_, at)) = self.notifications.front() {
            if at.elapsed() >= NOTIFICATION_TTL {
                self.notifications.pop_front();
            } else {
                break;
            }
        }
    }

    fn save_project(&mut self, project_id: &str) {
        let tickets: Vec<Ticket> = self
            .board
            .all()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        if let Err(e) = self.ticket_store.save(project_id, &tickets) {
            // The in-memory model stays authoritative; any later mutation
            // retries the save
            error!(project = %project_id, error = %e, "Ticket save failed");
            self.notify(format!("Save failed: {e}"));
        }
    }

    fn save_all(&mut self) {
        let project_ids: Vec<String> =
            self.registry.all().iter().map(|p| p.id.clone()).collect();
        for project_id in project_ids {
            self.save_project(&project_id);
        }
    }

    fn pane_size(&self) -> (u16, u16) {
        (
            self.term_cols.saturating_sub(2).max(20),
            self.term_rows.saturating_sub(3).max(5),
        )
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn render(&mut self, frame: &mut Frame) {
        if self.mode == Mode::AgentView {
            if let Some((title, status, rows)) = self.attached_view() {
                ui::render_agent_view(frame, &title, status, &rows, &self.theme);
                return;
            }
            // Stale attach: fall through to the board; the update step
            // clears the mode when it learns the pane is gone
        }

        let columns: Vec<ColumnData> = TicketStatus::all()
            .iter()
            .map(|status| ColumnData {
                status: *status,
                tickets: self.visible_column(*status),
            })
            .collect();

        let project_name = match &self.active_project {
            Some(id) => self
                .registry
                .get(id)
                .map_or("?", |p| p.name.as_str())
                .to_string(),
            None => "all projects".to_string(),
        };

        let status_line = match self.mode {
            Mode::Command => format!(":{}", self.command_line),
            Mode::Filter => format!("/{}  (Enter keep · Esc clear)", self.filter_query),
            Mode::Spawning => format!(
                "{} Creating worktree…",
                spinner_glyph(self.anim_frame)
            ),
            Mode::ShuttingDown => format!(
                "{} Stopping {} agent(s)…",
                spinner_glyph(self.anim_frame),
                self.shutdown_pending.len()
            ),
            _ => "h/l j/k move · Space advance · s spawn · Enter attach · ? help".to_string(),
        };

        let sidebar = self.sidebar_visible.then(|| SidebarData {
            projects: self.registry.all(),
            cursor: self.sidebar_cursor,
            active_project: self.active_project.as_deref(),
        });

        let ctx = BoardContext {
            columns: &columns,
            selected_column: self.selected_column,
            selected_row: self.selected_rows[self.selected_column],
            anim_frame: self.anim_frame,
            filter_text: (!self.filter_query.is_empty()).then_some(self.filter_query.as_str()),
            status_line: &status_line,
            notification: self.notifications.front().map(|(text, _)| text.as_str()),
            sidebar,
            theme: &self.theme,
            project_name: &project_name,
        };
        ui::render_board(frame, &ctx);

        match self.mode {
            Mode::Help => ui::HelpDialog::render(frame, &self.theme),
            Mode::Confirm => self.confirm.render(frame, &self.theme),
            Mode::CreateTicket | Mode::EditTicket => {
                if let Some(form) = &mut self.ticket_form {
                    form.render(frame, &self.theme);
                }
            }
            Mode::CreateProject => {
                if let Some(form) = &mut self.project_form {
                    form.render(frame, &self.theme);
                }
            }
            Mode::Settings => self.settings.render(frame, &self.config, &self.theme),
            _ => {}
        }
    }

    fn attached_view(&self) -> Option<(String, AgentStatus, Vec<String>)> {
        let ticket = self.board.get(self.attached.as_deref()?)?;
        let pane = self.panes.get(ticket.session_id.as_deref()?)?;
        Some((ticket.title.clone(), ticket.agent_status, pane.screen_rows()))
    }

    fn attach(&mut self) {
        let Some(ticket_id) = self.selected_ticket_id() else {
            return;
        };
        let has_pane = self
            .board
            .get(&ticket_id)
            .and_then(|t| t.session_id.as_ref())
            .is_some_and(|sid| self.panes.contains_key(sid));
        if has_pane {
            self.attached = Some(ticket_id);
            self.mode = Mode::AgentView;
        } else {
            self.notify("No agent attached to this ticket".to_string());
        }
    }
}

/// Run the dashboard: terminal setup, the input reader, the timers, and the
/// update loop itself.
pub async fn run(config: Config) -> Result<()> {
    ui::install_panic_hook();

    let (tx, mut rx) = crate::events::channel();
    let mut app = App::new(config, tx.clone())?;

    // Guard restores the terminal on every exit path
    let _guard = ui::TerminalGuard::new()?;
    let backend = ratatui::backend::CrosstermBackend::new(std::io::stdout());
    let mut terminal = ratatui::Terminal::new(backend)?;

    spawn_input_reader(tx.clone());
    spawn_timers(tx, app.config.poll_interval_secs());

    while !app.should_quit {
        terminal.draw(|frame| app.render(frame))?;

        let Some(event) = rx.recv().await else {
            break;
        };
        app.update(event);
        // Drain whatever else queued up before paying for another draw
        while !app.should_quit {
            match rx.try_recv() {
                Ok(event) => app.update(event),
                Err(_) => break,
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Blocking reader translating crossterm input into queue events.
fn spawn_input_reader(tx: EventSender) {
    let spawn = std::thread::Builder::new()
        .name("input-reader".to_string())
        .spawn(move || loop {
            match crossterm::event::read() {
                Ok(crossterm::event::Event::Key(key))
                    if key.kind == crossterm::event::KeyEventKind::Press =>
                {
                    if tx.send(Event::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(crossterm::event::Event::Resize(cols, rows)) => {
                    if tx.send(Event::Resize(cols, rows)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Input read failed");
                    break;
                }
            }
        });
    if let Err(e) = spawn {
        error!(error = %e, "Failed to spawn input reader");
    }
}

/// Status poll and animation tick producers.
fn spawn_timers(tx: EventSender, poll_secs: u64) {
    let poll_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(poll_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if poll_tx.send(Event::PollTick).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(Event::AnimationTick).is_err() {
                break;
            }
        }
    });
}

fn spinner_glyph(frame: u8) -> char {
    ['⠋', '⠙', '⠸', '⠴'][(frame % 4) as usize]
}

/// Split a filter query into `@project` tokens (lowercased, disjunctive) and
/// the remaining title substring.
fn parse_filter(query: &str) -> (Vec<String>, String) {
    let mut projects = Vec::new();
    let mut terms = Vec::new();
    for token in query.split_whitespace() {
        if let Some(name) = token.strip_prefix('@') {
            if !name.is_empty() {
                projects.push(name.to_lowercase());
            }
        } else {
            terms.push(token.to_lowercase());
        }
    }
    (projects, terms.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use tempfile::TempDir;

    fn test_app() -> (App, events::EventReceiver, TempDir) {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.data = Some(temp.path().to_string_lossy().to_string());
        let (tx, rx) = events::channel();
        let app = App::new(config, tx).unwrap();
        (app, rx, temp)
    }

    fn app_with_project() -> (App, events::EventReceiver, TempDir) {
        let (mut app, rx, temp) = test_app();
        let project = Project::new("demo", temp.path());
        app.registry.add(project).unwrap();
        (app, rx, temp)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.update(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn seed_ticket(app: &mut App, title: &str, status: TicketStatus) -> String {
        let project_id = app.registry.all()[0].id.clone();
        let mut ticket = Ticket::new(&project_id, title, "desc");
        ticket.status = status;
        let id = ticket.id.clone();
        app.board.insert(ticket);
        id
    }

    #[test]
    fn test_parse_filter_projects_and_text() {
        let (projects, text) = parse_filter("@web login @api bug");
        assert_eq!(projects, vec!["web", "api"]);
        assert_eq!(text, "login bug");

        let (projects, text) = parse_filter("");
        assert!(projects.is_empty());
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_mode_transitions() {
        let (mut app, _rx, _temp) = test_app();

        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.mode, Mode::Filter);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);

        press(&mut app, KeyCode::Char(':'));
        assert_eq!(app.mode, Mode::Command);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.mode, Mode::Help);
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.mode, Mode::Normal);

        press(&mut app, KeyCode::Char('O'));
        assert_eq!(app.mode, Mode::Settings);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn test_filter_escape_clears_query() {
        let (mut app, _rx, _temp) = test_app();
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.filter_query, "ab");

        press(&mut app, KeyCode::Esc);
        assert!(app.filter_query.is_empty());

        // Enter keeps the query
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.filter_query, "x");
    }

    #[tokio::test]
    async fn test_space_moves_ticket_forward_and_done_is_terminal() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "t", TicketStatus::Backlog);

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.board.get(&id).unwrap().status, TicketStatus::InProgress);

        // Cursor follows the column, ticket moved out of Backlog; select the
        // InProgress column to keep operating on it
        press(&mut app, KeyCode::Char('l'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.board.get(&id).unwrap().status, TicketStatus::Done);

        press(&mut app, KeyCode::Char('l'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.board.get(&id).unwrap().status, TicketStatus::Done);
    }

    #[tokio::test]
    async fn test_spawn_requires_in_progress() {
        let (mut app, _rx, _temp) = app_with_project();
        seed_ticket(&mut app, "t", TicketStatus::Backlog);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app
            .notifications
            .front()
            .is_some_and(|(text, _)| text.contains("In Progress")));
    }

    #[tokio::test]
    async fn test_delete_via_confirm() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "to delete", TicketStatus::Backlog);

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode, Mode::Confirm);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.board.get(&id).is_none());

        // And the deletion is persisted
        let stored = app
            .ticket_store
            .load(&app.registry.all()[0].id)
            .unwrap();
        assert!(stored.iter().all(|t| t.id != id));
    }

    #[tokio::test]
    async fn test_confirm_cancel_keeps_ticket() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "stay", TicketStatus::Backlog);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.board.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_late_events_are_ignored() {
        let (mut app, _rx, _temp) = app_with_project();

        // Events for panes and tickets that do not exist must not panic or
        // mutate anything
        app.update(Event::PaneOutput {
            session_id: "ghost".to_string(),
            bytes: b"hello".to_vec(),
        });
        app.update(Event::PaneExit {
            session_id: "ghost".to_string(),
            error: None,
        });
        app.update(Event::StatusReport(vec![(
            "missing-ticket".to_string(),
            AgentStatus::Working,
        )]));
        app.update(Event::SpawnFailed {
            ticket_id: "missing".to_string(),
            error: "nope".to_string(),
        });
        assert_eq!(app.mode, Mode::Normal);
    }

    #[tokio::test]
    async fn test_worktree_result_dropped_after_escape() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "t", TicketStatus::InProgress);

        // Simulate being mid-spawn, then escape
        app.spawning_ticket = Some(id.clone());
        app.mode = Mode::Spawning;
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);

        // The command completes late; its result must be dropped
        app.update(Event::WorktreeCreated {
            ticket_id: id.clone(),
            path: PathBuf::from("/tmp/wt"),
            branch: "task/x".to_string(),
            base_branch: "main".to_string(),
        });
        assert!(app.board.get(&id).unwrap().worktree_path.is_none());
    }

    #[tokio::test]
    async fn test_status_report_applies_to_live_tickets() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "t", TicketStatus::InProgress);
        app.board.get_mut(&id).unwrap().session_id = Some("s1".to_string());

        app.update(Event::StatusReport(vec![(id.clone(), AgentStatus::Waiting)]));
        assert_eq!(app.board.get(&id).unwrap().agent_status, AgentStatus::Waiting);
    }

    #[tokio::test]
    async fn test_edit_form_rejects_branch_rename_when_locked() {
        let (mut app, _rx, _temp) = app_with_project();
        let id = seed_ticket(&mut app, "t", TicketStatus::InProgress);
        {
            let ticket = app.board.get_mut(&id).unwrap();
            ticket.worktree_path = Some(PathBuf::from("/tmp/wt"));
            ticket.branch_name = Some("task/orig".to_string());
        }

        let result = ui::TicketFormResult {
            title: "t".to_string(),
            description: String::new(),
            priority: 3,
            agent_type: String::new(),
            labels: Default::default(),
            blocked_by: Default::default(),
            branch_name: Some("task/renamed".to_string()),
        };
        let err = app.apply_ticket_form(Some(id.clone()), result);
        assert!(err.is_some());
        assert_eq!(
            app.board.get(&id).unwrap().branch_name.as_deref(),
            Some("task/orig")
        );
    }

    #[tokio::test]
    async fn test_edit_form_rejects_blocking_cycle() {
        let (mut app, _rx, _temp) = app_with_project();
        let a = seed_ticket(&mut app, "a", TicketStatus::Backlog);
        let b = seed_ticket(&mut app, "b", TicketStatus::Backlog);
        app.board
            .get_mut(&b)
            .unwrap()
            .blocked_by
            .insert(a.clone());

        let mut blocked = std::collections::BTreeSet::new();
        blocked.insert(b.clone());
        let result = ui::TicketFormResult {
            title: "a".to_string(),
            description: String::new(),
            priority: 3,
            agent_type: String::new(),
            labels: Default::default(),
            blocked_by: blocked,
            branch_name: None,
        };
        let err = app.apply_ticket_form(Some(a.clone()), result);
        assert!(err.is_some());
        assert!(app.board.get(&a).unwrap().blocked_by.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_without_panes_quits_immediately() {
        let (mut app, _rx, _temp) = test_app();
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.mode, Mode::ShuttingDown);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_create_ticket_flow() {
        let (mut app, _rx, _temp) = app_with_project();

        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::CreateTicket);
        for c in "ship it".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        app.update(Event::Key(KeyEvent::new(
            KeyCode::Char('s'),
            KeyModifiers::CONTROL,
        )));
        assert_eq!(app.mode, Mode::Normal);

        let found = app.board.all().any(|t| t.title == "ship it");
        assert!(found);
    }

    #[tokio::test]
    async fn test_create_ticket_requires_project() {
        let (mut app, _rx, _temp) = test_app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Normal);
        assert!(!app.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_filter_hides_tickets() {
        let (mut app, _rx, _temp) = app_with_project();
        seed_ticket(&mut app, "alpha", TicketStatus::Backlog);
        seed_ticket(&mut app, "beta", TicketStatus::Backlog);

        app.filter_query = "alp".to_string();
        let visible = app.visible_column(TicketStatus::Backlog);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "alpha");

        app.filter_query.clear();
        assert_eq!(app.visible_column(TicketStatus::Backlog).len(), 2);
    }

    #[tokio::test]
    async fn test_filter_project_token() {
        let (mut app, _rx, _temp) = app_with_project();
        seed_ticket(&mut app, "mine", TicketStatus::Backlog);

        app.filter_query = "@demo".to_string();
        assert_eq!(app.visible_column(TicketStatus::Backlog).len(), 1);

        app.filter_query = "@other".to_string();
        assert_eq!(app.visible_column(TicketStatus::Backlog).len(), 0);
    }

    #[tokio::test]
    async fn test_cursor_clamped_to_column() {
        let (mut app, _rx, _temp) = app_with_project();
        seed_ticket(&mut app, "one", TicketStatus::Backlog);
        seed_ticket(&mut app, "two", TicketStatus::Backlog);

        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_rows[0], 1);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_rows[0], 1);
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.selected_rows[0], 0);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.selected_rows[0], 1);
    }
}
