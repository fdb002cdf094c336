//! Settings overlay: the handful of knobs worth changing at runtime.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::config::Config;
use crate::ui::{centered_fixed_rect, Theme};

const ROW_DEFAULT_AGENT: usize = 0;
const ROW_REMOVE_WORKTREE: usize = 1;
const ROW_THEME: usize = 2;
const ROW_COUNT: usize = 3;

/// Result of a settings keypress that the app must apply.
pub enum SettingsOutcome {
    Consumed,
    /// Config changed; persist it and rebuild the theme
    Changed,
    Closed,
}

pub struct SettingsView {
    cursor: usize,
}

impl SettingsView {
    pub fn new() -> Self {
        Self { cursor: 0 }
    }

    pub fn handle_key(&mut self, key: KeyEvent, config: &mut Config) -> SettingsOutcome {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => SettingsOutcome::Closed,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                SettingsOutcome::Consumed
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(ROW_COUNT - 1);
                SettingsOutcome::Consumed
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') | KeyCode::Enter => {
                self.cycle(config, matches!(key.code, KeyCode::Left));
                SettingsOutcome::Changed
            }
            _ => SettingsOutcome::Consumed,
        }
    }

    fn cycle(&self, config: &mut Config, backwards: bool) {
        match self.cursor {
            ROW_DEFAULT_AGENT => {
                let mut names: Vec<String> = config.agents.map.keys().cloned().collect();
                names.sort();
                if names.is_empty() {
                    return;
                }
                let current = names
                    .iter()
                    .position(|n| *n == config.agents.default_agent)
                    .unwrap_or(0);
                let next = if backwards {
                    (current + names.len() - 1) % names.len()
                } else {
                    (current + 1) % names.len()
                };
                config.agents.default_agent = names[next].clone();
            }
            ROW_REMOVE_WORKTREE => {
                config.git.remove_worktree_on_delete = !config.git.remove_worktree_on_delete;
            }
            ROW_THEME => {
                config.ui.theme = if config.ui.theme == "dark" {
                    "light".to_string()
                } else {
                    "dark".to_string()
                };
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, config: &Config, theme: &Theme) {
        let area = centered_fixed_rect(56, ROW_COUNT as u16 + 4, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.border_focused))
            .title(Span::styled(
                " Settings ",
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = [
            ("Default agent", config.agents.default_agent.clone()),
            (
                "Remove worktree on delete",
                config.git.remove_worktree_on_delete.to_string(),
            ),
            ("Theme", config.ui.theme.clone()),
            (
                "Poll interval (config file)",
                format!("{}s", config.poll_interval_secs()),
            ),
        ];

        let lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .map(|(i, (label, value))| {
                let focused = i == self.cursor;
                let marker = if focused { "› " } else { "  " };
                Line::from(vec![
                    Span::styled(
                        format!("{marker}{label:<28}"),
                        if focused {
                            Style::default()
                                .fg(theme.accent)
                                .add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(theme.text)
                        },
                    ),
                    Span::styled(value.clone(), Style::default().fg(theme.title)),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Default for SettingsView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(view: &mut SettingsView, config: &mut Config, code: KeyCode) -> SettingsOutcome {
        view.handle_key(KeyEvent::new(code, KeyModifiers::NONE), config)
    }

    #[test]
    fn test_cycle_default_agent() {
        let mut view = SettingsView::new();
        let mut config = Config::default();
        let before = config.agents.default_agent.clone();

        press(&mut view, &mut config, KeyCode::Right);
        assert_ne!(config.agents.default_agent, before);
    }

    #[test]
    fn test_toggle_worktree_policy() {
        let mut view = SettingsView::new();
        let mut config = Config::default();
        press(&mut view, &mut config, KeyCode::Down);
        let before = config.git.remove_worktree_on_delete;
        press(&mut view, &mut config, KeyCode::Enter);
        assert_eq!(config.git.remove_worktree_on_delete, !before);
    }

    #[test]
    fn test_escape_closes() {
        let mut view = SettingsView::new();
        let mut config = Config::default();
        assert!(matches!(
            press(&mut view, &mut config, KeyCode::Esc),
            SettingsOutcome::Closed
        ));
    }
}
