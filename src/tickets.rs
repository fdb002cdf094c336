//! Ticket and board data model.
//!
//! The board owns its tickets exclusively; panes and tickets reference each
//! other only through the pane-map key (`session_id`), never through shared
//! pointers.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

/// Column membership of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Backlog,
    InProgress,
    Done,
}

impl TicketStatus {
    /// All columns in board order.
    pub fn all() -> &'static [TicketStatus] {
        &[
            TicketStatus::Backlog,
            TicketStatus::InProgress,
            TicketStatus::Done,
        ]
    }

    /// The next column, or None when the ticket is already Done.
    pub fn next(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Backlog => Some(TicketStatus::InProgress),
            TicketStatus::InProgress => Some(TicketStatus::Done),
            TicketStatus::Done => None,
        }
    }

    /// The previous column, or None when the ticket is already in Backlog.
    pub fn prev(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Backlog => None,
            TicketStatus::InProgress => Some(TicketStatus::Backlog),
            TicketStatus::Done => Some(TicketStatus::InProgress),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TicketStatus::Backlog => "Backlog",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Done => "Done",
        }
    }
}

/// Displayed activity classification of a ticket's agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    None,
    Idle,
    Working,
    Waiting,
    Completed,
    Error,
}

impl AgentStatus {
    /// Token written to the side-channel status file.
    pub fn as_token(self) -> &'static str {
        match self {
            AgentStatus::None | AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Completed => "completed",
            AgentStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub agent_status: AgentStatus,
    /// Name of a configured agent, or empty for the default
    #[serde(default)]
    pub agent_type: String,
    /// Resolved once on first spawn; immutable until teardown
    #[serde(default)]
    pub worktree_path: Option<PathBuf>,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
    /// 1-5, lower = higher priority
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Ticket ids that must finish before this one
    #[serde(default)]
    pub blocked_by: BTreeSet<String>,
    pub project_id: String,
    /// Pane-map key for this ticket's running agent, if any
    #[serde(default)]
    pub session_id: Option<String>,
    /// Set on first successful spawn in the current session
    #[serde(default)]
    pub agent_spawned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_priority() -> u8 {
    3
}

impl Ticket {
    pub fn new(project_id: &str, title: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status: TicketStatus::Backlog,
            agent_status: AgentStatus::None,
            agent_type: String::new(),
            worktree_path: None,
            branch_name: None,
            base_branch: None,
            priority: default_priority(),
            labels: BTreeSet::new(),
            blocked_by: BTreeSet::new(),
            project_id: project_id.to_string(),
            session_id: None,
            agent_spawned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Short stable id prefix used in branch and session names.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map_or(self.id.len(), |(i, _)| i);
        &self.id[..end]
    }

    /// A branch is locked once a worktree has been carved out for it.
    pub fn branch_locked(&self) -> bool {
        self.worktree_path.is_some()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A named collection of columns and the tickets within them.
#[derive(Debug, Clone, Default)]
pub struct Board {
    /// Insertion-ordered ticket map; iteration order is stable across saves
    pub tickets: IndexMap<String, Ticket>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            tickets: IndexMap::new(),
        }
    }

    pub fn from_tickets(tickets: Vec<Ticket>) -> Self {
        let mut board = Self::new();
        for ticket in tickets {
            board.tickets.insert(ticket.id.clone(), ticket);
        }
        board
    }

    pub fn insert(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket.id.clone(), ticket);
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Ticket> {
        self.tickets.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Ticket> {
        self.tickets.shift_remove(id)
    }

    /// Ticket ids in one column, sorted by priority then creation time.
    pub fn column(&self, status: TicketStatus) -> Vec<&Ticket> {
        let mut tickets: Vec<&Ticket> = self
            .tickets
            .values()
            .filter(|t| t.status == status)
            .collect();
        tickets.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        tickets
    }

    pub fn all(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }

    /// Whether adding `blocker` to `ticket_id.blocked_by` would introduce a
    /// dependency cycle. Walks the blocked_by graph from the blocker.
    pub fn would_cycle(&self, ticket_id: &str, blocker: &str) -> bool {
        if ticket_id == blocker {
            return true;
        }
        let mut stack = vec![blocker.to_string()];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == ticket_id {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(t) = self.tickets.get(&current) {
                for dep in &t.blocked_by {
                    stack.push(dep.clone());
                }
            }
        }
        false
    }
}
