mod file_tree;
pub mod graph;
mod overlay;
mod panel;
mod status_bar;
mod styles;
mod utils;

use crate::app::{App, InputMode};
use crate::git::Host;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

/// Rows the commit list gets for a terminal of `height`: everything but the
/// bars and the list's own borders
pub fn list_viewport_rows(height: u16) -> usize {
    height.saturating_sub(1 + 1 + 2) as usize
}

/// Render the entire UI
pub fn draw<H: Host>(f: &mut Frame, app: &App<H>) {
    let bottom_height = status_bar::bottom_bar_height(app, f.area().width);

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // top bar
            Constraint::Min(1),                // main content
            Constraint::Length(bottom_height), // bottom bar (dynamic rows)
        ])
        .split(f.area());

    status_bar::render_top_bar(f, outer[0], app);

    let expanded = app.store.state().panel.expanded();
    if expanded.is_some() && outer[1].width >= 80 {
        // Commit list + detail panel (2/5)
        let main_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Fill(3), Constraint::Fill(2)])
            .split(outer[1]);
        graph::render(f, main_area[0], app);
        panel::render(f, main_area[1], app);
    } else if expanded.is_some() {
        // Narrow terminal: the panel replaces the list
        panel::render(f, outer[1], app);
    } else {
        graph::render(f, outer[1], app);
    }

    status_bar::render_bottom_bar(f, outer[2], app);

    if let Some(ref msg) = app.message {
        status_bar::render_notification(f, f.area(), msg);
    }

    if let Some(menu) = expanded.and_then(|e| e.menu) {
        let reviewing = expanded.is_some_and(|e| e.code_review.is_some());
        overlay::render_panel_menu(f, f.area(), menu, reviewing);
    }

    match app.input_mode {
        InputMode::Confirm(ref action) => overlay::render_confirm(f, f.area(), action),
        InputMode::PickRepo(selected) => {
            overlay::render_repo_picker(f, f.area(), &app.repo_options(), selected, app.store.current_repo())
        }
        InputMode::Normal | InputMode::Find => {}
    }

    if let Some(ref notice) = app.error {
        overlay::render_error(f, f.area(), notice);
    }
}
