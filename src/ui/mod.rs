//! Rendering and overlay widgets.
//!
//! Every render function here is a pure function of the model it is handed;
//! state lives on the widget structs owned by the app and is only mutated in
//! the update step.

mod agent_view;
mod board;
mod dialogs;
mod form_field;
mod forms;
mod settings;
mod terminal_guard;
mod theme;

pub use agent_view::render_agent_view;
pub use board::{render_board, BoardContext, ColumnData, SidebarData, MIN_COLUMN_WIDTH};
pub use dialogs::{ConfirmAction, ConfirmDialog, HelpDialog};
pub use form_field::FormField;
pub use forms::{FormOutcome, ProjectForm, TicketForm, TicketFormResult};
pub use settings::{SettingsOutcome, SettingsView};
pub use terminal_guard::{install_panic_hook, TerminalGuard};
pub use theme::Theme;

use ratatui::layout::Rect;

/// A rectangle of the given percentage size, centered over `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

/// A fixed-size rectangle centered over `area`, clamped to fit.
pub fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
