//! Board rendering: header, project sidebar, the column strip, and the
//! status bar.
//!
//! The strip scrolls horizontally when the terminal cannot fit every column
//! at the minimum width; the active column is always kept fully visible and
//! clipped sides get `◀`/`▶` indicators.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use crate::store::Project;
use crate::tickets::{AgentStatus, Ticket, TicketStatus};
use crate::ui::Theme;

/// Columns narrower than this are clipped out of the strip instead.
pub const MIN_COLUMN_WIDTH: u16 = 28;

const SIDEBAR_WIDTH: u16 = 24;

/// Spinner frames for Working agents, driven by the animation tick.
const SPINNER_FRAMES: [char; 4] = ['⠋', '⠙', '⠸', '⠴'];

/// One rendered column: its status plus the (already filtered) tickets.
pub struct ColumnData<'a> {
    pub status: TicketStatus,
    pub tickets: Vec<&'a Ticket>,
}

pub struct SidebarData<'a> {
    pub projects: &'a [Project],
    pub cursor: usize,
    pub active_project: Option<&'a str>,
}

pub struct BoardContext<'a> {
    pub columns: &'a [ColumnData<'a>],
    pub selected_column: usize,
    pub selected_row: usize,
    pub anim_frame: u8,
    pub filter_text: Option<&'a str>,
    pub status_line: &'a str,
    pub notification: Option<&'a str>,
    pub sidebar: Option<SidebarData<'a>>,
    pub theme: &'a Theme,
    pub project_name: &'a str,
}

pub fn render_board(frame: &mut Frame, ctx: &BoardContext) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Board
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], ctx);

    let body = if let Some(sidebar) = &ctx.sidebar {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(chunks[1]);
        render_sidebar(frame, split[0], sidebar, ctx.theme);
        split[1]
    } else {
        chunks[1]
    };

    render_columns(frame, body, ctx);
    render_status_bar(frame, chunks[2], ctx);
}

fn render_header(frame: &mut Frame, area: Rect, ctx: &BoardContext) {
    let theme = ctx.theme;
    let total: usize = ctx.columns.iter().map(|c| c.tickets.len()).sum();

    let mut spans = vec![
        Span::styled(
            " OpenKanban ",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("· {} ", ctx.project_name),
            Style::default().fg(theme.accent),
        ),
        Span::styled(
            format!("· {total} tickets"),
            Style::default().fg(theme.dim),
        ),
    ];
    if let Some(filter) = ctx.filter_text {
        if !filter.is_empty() {
            spans.push(Span::styled(
                format!("  /{filter}"),
                Style::default().fg(theme.notification),
            ));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, sidebar: &SidebarData, theme: &Theme) {
    let items: Vec<ListItem> = std::iter::once(ListItem::new(Span::styled(
        "All projects",
        if sidebar.active_project.is_none() {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text)
        },
    )))
    .chain(sidebar.projects.iter().map(|p| {
        let active = sidebar.active_project == Some(p.id.as_str());
        ListItem::new(Span::styled(
            p.name.clone(),
            if active {
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            },
        ))
    }))
    .collect();

    let mut state = ratatui::widgets::ListState::default();
    state.select(Some(sidebar.cursor));

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .title(Span::styled(" Projects ", Style::default().fg(theme.title))),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(list, area, &mut state);
}

/// How many columns fit and which is the first visible one. Pure function of
/// width and the selected column, so rendering stays deterministic.
fn strip_window(width: u16, column_count: usize, selected: usize) -> (usize, usize) {
    let visible = ((width / MIN_COLUMN_WIDTH) as usize).clamp(1, column_count);
    let first = selected.saturating_sub(visible - 1).min(column_count - visible);
    (first, visible)
}

fn render_columns(frame: &mut Frame, area: Rect, ctx: &BoardContext) {
    if ctx.columns.is_empty() || area.width == 0 {
        return;
    }
    let (first, visible) = strip_window(area.width, ctx.columns.len(), ctx.selected_column);
    let clipped_left = first > 0;
    let clipped_right = first + visible < ctx.columns.len();

    let constraints: Vec<Constraint> = (0..visible)
        .map(|_| Constraint::Ratio(1, visible as u32))
        .collect();
    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (slot, column_idx) in (first..first + visible).enumerate() {
        let column = &ctx.columns[column_idx];
        let focused = column_idx == ctx.selected_column;
        render_column(frame, slots[slot], ctx, column, focused);
    }

    // More-indicators over the strip edges
    if clipped_left {
        let indicator = Rect::new(area.x, area.y, 1, 1);
        frame.render_widget(
            Paragraph::new(Span::styled("◀", Style::default().fg(ctx.theme.accent))),
            indicator,
        );
    }
    if clipped_right {
        let indicator = Rect::new(area.right().saturating_sub(1), area.y, 1, 1);
        frame.render_widget(
            Paragraph::new(Span::styled("▶", Style::default().fg(ctx.theme.accent))),
            indicator,
        );
    }
}

fn render_column(
    frame: &mut Frame,
    area: Rect,
    ctx: &BoardContext,
    column: &ColumnData,
    focused: bool,
) {
    let theme = ctx.theme;
    let border_color = if focused {
        theme.border_focused
    } else {
        theme.border
    };
    let title = format!(" {} ({}) ", column.status.title(), column.tickets.len());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.title)
                .add_modifier(if focused { Modifier::BOLD } else { Modifier::empty() }),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Two lines per card; scroll to keep the selection visible
    let rows_per_card = 2usize;
    let capacity = (inner.height as usize / rows_per_card).max(1);
    let selected = if focused { ctx.selected_row } else { usize::MAX };
    let first = if focused {
        ctx.selected_row.saturating_sub(capacity - 1)
    } else {
        0
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, ticket) in column.tickets.iter().enumerate().skip(first).take(capacity) {
        let is_selected = i == selected;
        lines.push(card_title_line(ticket, is_selected, ctx));
        lines.push(card_meta_line(ticket, ctx));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn agent_glyph(ticket: &Ticket, anim_frame: u8) -> Option<char> {
    match ticket.agent_status {
        AgentStatus::None => None,
        AgentStatus::Idle => Some('◦'),
        AgentStatus::Working => Some(SPINNER_FRAMES[(anim_frame % 4) as usize]),
        AgentStatus::Waiting => Some('?'),
        AgentStatus::Completed => Some('✓'),
        AgentStatus::Error => Some('✗'),
    }
}

fn card_title_line<'a>(ticket: &'a Ticket, selected: bool, ctx: &BoardContext) -> Line<'a> {
    let theme = ctx.theme;
    let mut spans = Vec::new();

    if let Some(glyph) = agent_glyph(ticket, ctx.anim_frame) {
        spans.push(Span::styled(
            format!("{glyph} "),
            Style::default().fg(theme.agent_color(ticket.agent_status)),
        ));
    } else {
        spans.push(Span::raw("  "));
    }

    let title_style = if selected {
        Style::default()
            .fg(theme.selection)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(theme.text)
    };
    spans.push(Span::styled(ticket.title.as_str(), title_style));

    Line::from(spans)
}

fn card_meta_line<'a>(ticket: &'a Ticket, ctx: &BoardContext) -> Line<'a> {
    let theme = ctx.theme;
    let mut spans = vec![Span::styled(
        format!("  P{}", ticket.priority),
        Style::default().fg(theme.dim),
    )];

    if !ticket.blocked_by.is_empty() {
        spans.push(Span::styled(
            " ⊘blocked",
            Style::default().fg(theme.agent_error),
        ));
    }
    for label in ticket.labels.iter().take(3) {
        spans.push(Span::styled(
            format!(" #{label}"),
            Style::default().fg(theme.accent),
        ));
    }
    if let Some(branch) = &ticket.branch_name {
        spans.push(Span::styled(
            format!(" {branch}"),
            Style::default().fg(theme.dim),
        ));
    }

    Line::from(spans)
}

fn render_status_bar(frame: &mut Frame, area: Rect, ctx: &BoardContext) {
    let theme = ctx.theme;

    let content = if let Some(notice) = ctx.notification {
        Line::from(Span::styled(
            format!(" {notice}"),
            Style::default()
                .fg(theme.notification)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            format!(" {}", ctx.status_line),
            Style::default().fg(theme.dim),
        ))
    };

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(content), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_window_fits_all() {
        // Wide enough for all three columns
        let (first, visible) = strip_window(120, 3, 0);
        assert_eq!((first, visible), (0, 3));
    }

    #[test]
    fn test_strip_window_keeps_active_visible() {
        // Room for one column only: the active one is shown
        let (first, visible) = strip_window(30, 3, 2);
        assert_eq!(visible, 1);
        assert_eq!(first, 2);

        let (first, _) = strip_window(30, 3, 0);
        assert_eq!(first, 0);
    }

    #[test]
    fn test_strip_window_two_visible() {
        let (first, visible) = strip_window(60, 3, 2);
        assert_eq!(visible, 2);
        // Selected column 2 stays in view
        assert_eq!(first, 1);
    }

    #[test]
    fn test_strip_window_never_zero() {
        let (_, visible) = strip_window(5, 3, 1);
        assert_eq!(visible, 1);
    }
}
