//! Help and confirmation overlays.

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::ui::{centered_fixed_rect, Theme};

/// Side effect armed behind the Confirm overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteTicket { ticket_id: String },
}

#[derive(Debug, Default)]
pub struct ConfirmDialog {
    pub message: String,
    pub action: Option<ConfirmAction>,
}

impl ConfirmDialog {
    pub fn arm(&mut self, message: &str, action: ConfirmAction) {
        self.message = message.to_string();
        self.action = Some(action);
    }

    pub fn take(&mut self) -> Option<ConfirmAction> {
        self.message.clear();
        self.action.take()
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.action = None;
    }

    pub fn render(&self, frame: &mut Frame, theme: &Theme) {
        let width = (self.message.len() as u16 + 6).clamp(30, 70);
        let area = centered_fixed_rect(width, 5, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.agent_error))
            .title(Span::styled(
                " Confirm ",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = vec![
            Line::from(Span::styled(
                self.message.clone(),
                Style::default().fg(theme.text),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("y", Style::default().fg(theme.agent_error).add_modifier(Modifier::BOLD)),
                Span::styled(" confirm   ", Style::default().fg(theme.dim)),
                Span::styled("n/Esc", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
                Span::styled(" cancel", Style::default().fg(theme.dim)),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

pub struct HelpDialog;

impl HelpDialog {
    const KEYMAP: &'static [(&'static str, &'static str)] = &[
        ("h/l", "move between columns"),
        ("j/k", "move within a column"),
        ("g/G", "jump to first/last ticket"),
        ("n", "new ticket"),
        ("e", "edit ticket"),
        ("d", "delete ticket"),
        ("Space", "move ticket to next column"),
        ("-", "move ticket to previous column"),
        ("s", "spawn agent (In Progress only)"),
        ("S", "stop agent"),
        ("Enter", "attach to agent pane"),
        ("/", "filter tickets"),
        (":", "command line"),
        ("O", "settings"),
        ("[", "toggle project sidebar"),
        ("p", "new project"),
        ("?", "toggle this help"),
        ("q", "quit"),
    ];

    pub fn render(frame: &mut Frame, theme: &Theme) {
        let height = Self::KEYMAP.len() as u16 + 2;
        let area = centered_fixed_rect(48, height, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border_focused))
            .title(Span::styled(
                " Keys ",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines: Vec<Line> = Self::KEYMAP
            .iter()
            .map(|(key, effect)| {
                Line::from(vec![
                    Span::styled(
                        format!("{key:>7}  "),
                        Style::default()
                            .fg(theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(*effect, Style::default().fg(theme.text)),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}
