//! Form field widgets shared by the ticket and project forms.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::ui::Theme;

pub enum FormField {
    /// Single-line text input
    TextInput { value: String, cursor_pos: usize },
    /// Multi-line text input using tui-textarea
    TextArea { textarea: Box<TextArea<'static>> },
    /// Selection from predefined options
    Select { options: Vec<String>, selected: usize },
}

impl FormField {
    pub fn text(initial: &str) -> Self {
        FormField::TextInput {
            value: initial.to_string(),
            cursor_pos: initial.chars().count(),
        }
    }

    pub fn multiline(initial: &str) -> Self {
        let mut textarea = TextArea::default();
        textarea.insert_str(initial);
        FormField::TextArea {
            textarea: Box::new(textarea),
        }
    }

    pub fn select(options: Vec<String>, selected: usize) -> Self {
        let selected = selected.min(options.len().saturating_sub(1));
        FormField::Select { options, selected }
    }

    pub fn value(&self) -> String {
        match self {
            FormField::TextInput { value, .. } => value.clone(),
            FormField::TextArea { textarea } => textarea.lines().join("\n"),
            FormField::Select { options, selected } => {
                options.get(*selected).cloned().unwrap_or_default()
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match self {
            FormField::TextInput { value, cursor_pos } => match key.code {
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    let byte = byte_index(value, *cursor_pos);
                    value.insert(byte, c);
                    *cursor_pos += 1;
                }
                KeyCode::Backspace => {
                    if *cursor_pos > 0 {
                        *cursor_pos -= 1;
                        let byte = byte_index(value, *cursor_pos);
                        value.remove(byte);
                    }
                }
                KeyCode::Delete => {
                    if *cursor_pos < value.chars().count() {
                        let byte = byte_index(value, *cursor_pos);
                        value.remove(byte);
                    }
                }
                KeyCode::Left => *cursor_pos = cursor_pos.saturating_sub(1),
                KeyCode::Right => {
                    if *cursor_pos < value.chars().count() {
                        *cursor_pos += 1;
                    }
                }
                KeyCode::Home => *cursor_pos = 0,
                KeyCode::End => *cursor_pos = value.chars().count(),
                _ => {}
            },
            FormField::TextArea { textarea } => {
                textarea.input(key);
            }
            FormField::Select { options, selected } => match key.code {
                KeyCode::Left | KeyCode::Up => *selected = selected.saturating_sub(1),
                KeyCode::Right | KeyCode::Down => {
                    if *selected + 1 < options.len() {
                        *selected += 1;
                    }
                }
                _ => {}
            },
        }
    }

    pub fn render_height(&self) -> u16 {
        match self {
            FormField::TextInput { .. } | FormField::Select { .. } => 1,
            FormField::TextArea { .. } => 5,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        match self {
            FormField::TextInput { value, cursor_pos } => {
                let mut text = value.clone();
                if focused {
                    let byte = byte_index(&text, *cursor_pos);
                    text.insert(byte, '▏');
                }
                let style = Style::default().fg(if focused { theme.title } else { theme.text });
                frame.render_widget(Paragraph::new(text).style(style), area);
            }
            FormField::TextArea { textarea } => {
                textarea.set_cursor_line_style(Style::default());
                textarea.set_cursor_style(if focused {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                });
                textarea.set_block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(if focused {
                            theme.border_focused
                        } else {
                            theme.border
                        })),
                );
                frame.render_widget(&**textarea, area);
            }
            FormField::Select { options, selected } => {
                let spans: Vec<Span> = options
                    .iter()
                    .enumerate()
                    .flat_map(|(i, opt)| {
                        let style = if i == *selected {
                            Style::default()
                                .fg(theme.accent)
                                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                        } else {
                            Style::default().fg(theme.dim)
                        };
                        [Span::styled(format!(" {opt} "), style), Span::raw(" ")]
                    })
                    .collect();
                frame.render_widget(Paragraph::new(Line::from(spans)), area);
            }
        }
    }
}

/// Byte offset of the nth char, for cursor-safe edits on UTF-8 values.
fn byte_index(value: &str, char_pos: usize) -> usize {
    value
        .char_indices()
        .nth(char_pos)
        .map_or(value.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(field: &mut FormField, code: KeyCode) {
        field.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_text_input_editing() {
        let mut field = FormField::text("");
        press(&mut field, KeyCode::Char('h'));
        press(&mut field, KeyCode::Char('i'));
        assert_eq!(field.value(), "hi");

        press(&mut field, KeyCode::Backspace);
        assert_eq!(field.value(), "h");
    }

    #[test]
    fn test_text_input_utf8_cursor() {
        let mut field = FormField::text("héllo");
        press(&mut field, KeyCode::Home);
        press(&mut field, KeyCode::Right);
        press(&mut field, KeyCode::Delete);
        assert_eq!(field.value(), "hllo");
    }

    #[test]
    fn test_select_navigation_clamps() {
        let mut field = FormField::select(vec!["a".into(), "b".into()], 0);
        press(&mut field, KeyCode::Left);
        assert_eq!(field.value(), "a");
        press(&mut field, KeyCode::Right);
        press(&mut field, KeyCode::Right);
        assert_eq!(field.value(), "b");
    }

    #[test]
    fn test_multiline_value() {
        let mut field = FormField::multiline("line one");
        press(&mut field, KeyCode::Enter);
        press(&mut field, KeyCode::Char('x'));
        assert_eq!(field.value(), "line one\nx");
    }
}
