//! Ticket create/edit form and the project registration form.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::collections::BTreeSet;

use crate::tickets::Ticket;
use crate::ui::{centered_rect, FormField, Theme};

const FIELD_TITLE: usize = 0;
const FIELD_DESCRIPTION: usize = 1;
const FIELD_PRIORITY: usize = 2;
const FIELD_AGENT: usize = 3;
const FIELD_LABELS: usize = 4;
const FIELD_BLOCKED_BY: usize = 5;
const FIELD_BRANCH: usize = 6;
const FIELD_COUNT: usize = 7;

/// Values collected when a ticket form is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketFormResult {
    pub title: String,
    pub description: String,
    pub priority: u8,
    pub agent_type: String,
    pub labels: BTreeSet<String>,
    pub blocked_by: BTreeSet<String>,
    pub branch_name: Option<String>,
}

/// What the form did with a key.
pub enum FormOutcome {
    Consumed,
    Submitted,
    Cancelled,
}

pub struct TicketForm {
    fields: Vec<FormField>,
    labels: Vec<&'static str>,
    focused: usize,
    /// Ticket being edited, or None when creating
    pub editing: Option<String>,
    /// Set when the ticket's worktree exists; the branch field is read-only
    branch_locked: bool,
    pub error: Option<String>,
}

impl TicketForm {
    /// An empty form for creating a ticket.
    pub fn create(agent_names: Vec<String>) -> Self {
        Self::build(None, agent_names, "", "", 3, "", "", "", false)
    }

    /// A form pre-filled from an existing ticket.
    pub fn edit(ticket: &Ticket, agent_names: Vec<String>) -> Self {
        let labels = ticket
            .labels
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let blocked = ticket
            .blocked_by
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        Self::build(
            Some(ticket.id.clone()),
            agent_names,
            &ticket.title,
            &ticket.description,
            ticket.priority,
            &ticket.agent_type,
            &labels,
            &blocked,
            ticket.branch_locked(),
        )
        .with_branch(ticket.branch_name.as_deref().unwrap_or(""))
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        editing: Option<String>,
        mut agent_names: Vec<String>,
        title: &str,
        description: &str,
        priority: u8,
        agent_type: &str,
        labels: &str,
        blocked_by: &str,
        branch_locked: bool,
    ) -> Self {
        agent_names.insert(0, "default".to_string());
        let agent_selected = agent_names
            .iter()
            .position(|n| n == agent_type)
            .unwrap_or(0);
        let priorities: Vec<String> = (1..=5).map(|p| format!("P{p}")).collect();

        let fields = vec![
            FormField::text(title),
            FormField::multiline(description),
            FormField::select(priorities, (priority.clamp(1, 5) - 1) as usize),
            FormField::select(agent_names, agent_selected),
            FormField::text(labels),
            FormField::text(blocked_by),
            FormField::text(""),
        ];

        Self {
            fields,
            labels: vec![
                "Title",
                "Description",
                "Priority",
                "Agent",
                "Labels",
                "Blocked by",
                "Branch",
            ],
            focused: 0,
            editing,
            branch_locked,
            error: None,
        }
    }

    fn with_branch(mut self, branch: &str) -> Self {
        self.fields[FIELD_BRANCH] = FormField::text(branch);
        self
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        self.error = None;
        match key.code {
            KeyCode::Esc => return FormOutcome::Cancelled,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return FormOutcome::Submitted;
            }
            KeyCode::Tab => {
                self.focused = (self.focused + 1) % FIELD_COUNT;
                self.skip_locked_branch(true);
            }
            KeyCode::BackTab => {
                self.focused = (self.focused + FIELD_COUNT - 1) % FIELD_COUNT;
                self.skip_locked_branch(false);
            }
            KeyCode::Enter if self.focused != FIELD_DESCRIPTION => {
                if self.focused + 1 >= FIELD_COUNT {
                    return FormOutcome::Submitted;
                }
                self.focused += 1;
                self.skip_locked_branch(true);
            }
            _ => {
                if !(self.focused == FIELD_BRANCH && self.branch_locked) {
                    self.fields[self.focused].handle_key(key);
                }
            }
        }
        FormOutcome::Consumed
    }

    fn skip_locked_branch(&mut self, forward: bool) {
        if self.focused == FIELD_BRANCH && self.branch_locked {
            self.focused = if forward { 0 } else { FIELD_BLOCKED_BY };
        }
    }

    /// Collect the form values. Returns an error string for the form to
    /// display when the title is empty.
    pub fn result(&self) -> Result<TicketFormResult, String> {
        let title = self.fields[FIELD_TITLE].value().trim().to_string();
        if title.is_empty() {
            return Err("Title must not be empty".to_string());
        }

        let priority = self.fields[FIELD_PRIORITY]
            .value()
            .trim_start_matches('P')
            .parse::<u8>()
            .unwrap_or(3);

        let agent = self.fields[FIELD_AGENT].value();
        let agent_type = if agent == "default" { String::new() } else { agent };

        let branch = self.fields[FIELD_BRANCH].value().trim().to_string();

        Ok(TicketFormResult {
            title,
            description: self.fields[FIELD_DESCRIPTION].value(),
            priority,
            agent_type,
            labels: split_csv(&self.fields[FIELD_LABELS].value()),
            blocked_by: split_csv(&self.fields[FIELD_BLOCKED_BY].value()),
            branch_name: if branch.is_empty() { None } else { Some(branch) },
        })
    }

    pub fn render(&mut self, frame: &mut Frame, theme: &Theme) {
        let area = centered_rect(64, 80, frame.area());
        frame.render_widget(Clear, area);

        let title = if self.editing.is_some() {
            " Edit Ticket "
        } else {
            " New Ticket "
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border_focused))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut constraints: Vec<Constraint> = Vec::new();
        for field in &self.fields {
            constraints.push(Constraint::Length(1)); // label
            constraints.push(Constraint::Length(field.render_height()));
        }
        constraints.push(Constraint::Length(1)); // hint / error line
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (i, field) in self.fields.iter_mut().enumerate() {
            let focused = i == self.focused;
            let label_style = if focused {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.dim)
            };
            let mut label = self.labels[i].to_string();
            if i == FIELD_BRANCH && self.branch_locked {
                label.push_str(" (locked: worktree exists)");
            }
            frame.render_widget(
                Paragraph::new(Span::styled(label, label_style)),
                rows[i * 2],
            );
            field.render(frame, rows[i * 2 + 1], focused, theme);
        }

        let footer = if let Some(ref error) = self.error {
            Line::from(Span::styled(
                error.clone(),
                Style::default().fg(theme.agent_error),
            ))
        } else {
            Line::from(Span::styled(
                "Tab next · Enter next/submit · Ctrl+S submit · Esc cancel",
                Style::default().fg(theme.dim),
            ))
        };
        frame.render_widget(Paragraph::new(footer), rows[FIELD_COUNT * 2]);
    }
}

fn split_csv(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Minimal form for registering a project: name + repository path.
pub struct ProjectForm {
    name: FormField,
    repo_path: FormField,
    focused: usize,
    pub error: Option<String>,
}

impl ProjectForm {
    pub fn new() -> Self {
        Self {
            name: FormField::text(""),
            repo_path: FormField::text(""),
            focused: 0,
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        self.error = None;
        match key.code {
            KeyCode::Esc => FormOutcome::Cancelled,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focused = 1 - self.focused;
                FormOutcome::Consumed
            }
            KeyCode::Enter => {
                if self.focused == 0 {
                    self.focused = 1;
                    FormOutcome::Consumed
                } else {
                    FormOutcome::Submitted
                }
            }
            _ => {
                let field = if self.focused == 0 {
                    &mut self.name
                } else {
                    &mut self.repo_path
                };
                field.handle_key(key);
                FormOutcome::Consumed
            }
        }
    }

    /// (name, repo_path) when both are present and the path exists.
    pub fn result(&self) -> Result<(String, String), String> {
        let name = self.name.value().trim().to_string();
        let path = self.repo_path.value().trim().to_string();
        if name.is_empty() {
            return Err("Project name must not be empty".to_string());
        }
        if path.is_empty() {
            return Err("Repository path must not be empty".to_string());
        }
        if !std::path::Path::new(&path).is_dir() {
            return Err(format!("Not a directory: {path}"));
        }
        Ok((name, path))
    }

    pub fn render(&mut self, frame: &mut Frame, theme: &Theme) {
        let area = centered_rect(50, 40, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border_focused))
            .title(Span::styled(
                " New Project ",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        render_labeled(frame, rows[0], rows[1], "Name", &mut self.name, self.focused == 0, theme);
        render_labeled(
            frame,
            rows[2],
            rows[3],
            "Repository path",
            &mut self.repo_path,
            self.focused == 1,
            theme,
        );

        let footer = if let Some(ref error) = self.error {
            Span::styled(error.clone(), Style::default().fg(theme.agent_error))
        } else {
            Span::styled(
                "Enter submit · Esc cancel",
                Style::default().fg(theme.dim),
            )
        };
        frame.render_widget(Paragraph::new(Line::from(footer)), rows[4]);
    }
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self::new()
    }
}

fn render_labeled(
    frame: &mut Frame,
    label_area: Rect,
    field_area: Rect,
    label: &str,
    field: &mut FormField,
    focused: bool,
    theme: &Theme,
) {
    let style = if focused {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    };
    frame.render_widget(Paragraph::new(Span::styled(label.to_string(), style)), label_area);
    field.render(frame, field_area, focused, theme);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(form: &mut TicketForm, code: KeyCode) -> FormOutcome {
        form.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_create_form_requires_title() {
        let form = TicketForm::create(vec!["claude".to_string()]);
        assert!(form.result().is_err());
    }

    #[test]
    fn test_create_form_collects_values() {
        let mut form = TicketForm::create(vec!["claude".to_string()]);
        press(&mut form, KeyCode::Char('f'));
        press(&mut form, KeyCode::Char('i'));
        press(&mut form, KeyCode::Char('x'));

        let result = form.result().unwrap();
        assert_eq!(result.title, "fix");
        assert_eq!(result.priority, 3);
        assert_eq!(result.agent_type, "");
        assert!(result.labels.is_empty());
    }

    #[test]
    fn test_edit_form_prefills() {
        let mut ticket = Ticket::new("p1", "old title", "desc");
        ticket.priority = 1;
        ticket.labels.insert("infra".to_string());
        let form = TicketForm::edit(&ticket, vec!["claude".to_string()]);

        let result = form.result().unwrap();
        assert_eq!(result.title, "old title");
        assert_eq!(result.priority, 1);
        assert!(result.labels.contains("infra"));
    }

    #[test]
    fn test_locked_branch_rejects_edits() {
        let mut ticket = Ticket::new("p1", "t", "");
        ticket.branch_name = Some("task/abc".to_string());
        ticket.worktree_path = Some(std::path::PathBuf::from("/tmp/wt"));

        let mut form = TicketForm::edit(&ticket, vec![]);
        // Jump to the branch field and try to type
        for _ in 0..FIELD_BRANCH {
            press(&mut form, KeyCode::Tab);
        }
        // Tab onto the locked branch field skips back to the start
        press(&mut form, KeyCode::Char('x'));

        let result = form.result().unwrap();
        assert_eq!(result.branch_name.as_deref(), Some("task/abc"));
    }

    #[test]
    fn test_split_csv() {
        let set = split_csv(" a, b ,,c ");
        assert_eq!(set.len(), 3);
        assert!(set.contains("a") && set.contains("b") && set.contains("c"));
    }

    #[test]
    fn test_project_form_validates_path() {
        let mut form = ProjectForm::new();
        for c in "demo".chars() {
            form.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        form.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        for c in "/definitely/not/here".chars() {
            form.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        assert!(form.result().is_err());
    }
}
