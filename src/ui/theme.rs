//! Theme palette: a named base palette plus per-field color overrides from
//! the configuration.

use ratatui::style::Color;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    pub border: Color,
    pub border_focused: Color,
    pub title: Color,
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub selection: Color,
    pub agent_idle: Color,
    pub agent_working: Color,
    pub agent_waiting: Color,
    pub agent_completed: Color,
    pub agent_error: Color,
    pub notification: Color,
}

impl Theme {
    fn dark() -> Self {
        Self {
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            title: Color::White,
            text: Color::Gray,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            selection: Color::Cyan,
            agent_idle: Color::Blue,
            agent_working: Color::Yellow,
            agent_waiting: Color::Magenta,
            agent_completed: Color::Green,
            agent_error: Color::Red,
            notification: Color::Yellow,
        }
    }

    fn light() -> Self {
        Self {
            border: Color::Gray,
            border_focused: Color::Blue,
            title: Color::Black,
            text: Color::DarkGray,
            dim: Color::Gray,
            accent: Color::Blue,
            selection: Color::Blue,
            agent_idle: Color::Blue,
            agent_working: Color::Rgb(180, 120, 0),
            agent_waiting: Color::Magenta,
            agent_completed: Color::Green,
            agent_error: Color::Red,
            notification: Color::Rgb(180, 120, 0),
        }
    }

    /// Resolve a theme by name and apply per-field overrides.
    pub fn load(name: &str, overrides: &HashMap<String, String>) -> Self {
        let mut theme = match name {
            "light" => Self::light(),
            _ => Self::dark(),
        };
        for (field, value) in overrides {
            let Some(color) = parse_color(value) else {
                continue;
            };
            match field.as_str() {
                "border" => theme.border = color,
                "border_focused" => theme.border_focused = color,
                "title" => theme.title = color,
                "text" => theme.text = color,
                "dim" => theme.dim = color,
                "accent" => theme.accent = color,
                "selection" => theme.selection = color,
                "agent_idle" => theme.agent_idle = color,
                "agent_working" => theme.agent_working = color,
                "agent_waiting" => theme.agent_waiting = color,
                "agent_completed" => theme.agent_completed = color,
                "agent_error" => theme.agent_error = color,
                "notification" => theme.notification = color,
                _ => {}
            }
        }
        theme
    }

    pub fn agent_color(&self, status: crate::tickets::AgentStatus) -> Color {
        use crate::tickets::AgentStatus;
        match status {
            AgentStatus::None => self.dim,
            AgentStatus::Idle => self.agent_idle,
            AgentStatus::Working => self.agent_working,
            AgentStatus::Waiting => self.agent_waiting,
            AgentStatus::Completed => self.agent_completed,
            AgentStatus::Error => self.agent_error,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Parse a color name or `#rrggbb` value.
fn parse_color(value: &str) -> Option<Color> {
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Color::Rgb(r, g, b));
        }
        return None;
    }
    match value.to_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "white" => Some(Color::White),
        _ => None,
    }
}
