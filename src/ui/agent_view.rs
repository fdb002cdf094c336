//! Attached agent view: the pane's screen with a thin frame around it.

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::tickets::AgentStatus;
use crate::ui::Theme;

pub fn render_agent_view(
    frame: &mut Frame,
    title: &str,
    agent_status: AgentStatus,
    screen_rows: &[String],
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
        .title_top(
            Line::from(Span::styled(
                format!(" {:?} ", agent_status),
                Style::default().fg(theme.agent_color(agent_status)),
            ))
            .right_aligned(),
        );
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);

    // Show the bottom of the screen when it is taller than the viewport
    let visible = inner.height as usize;
    let start = screen_rows.len().saturating_sub(visible);
    let lines: Vec<Line> = screen_rows[start..]
        .iter()
        .map(|row| Line::from(row.clone()))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            " Esc detach · keystrokes go to the agent",
            Style::default().fg(theme.dim),
        ))),
        chunks[1],
    );
}
