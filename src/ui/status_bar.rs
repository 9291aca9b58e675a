use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::styles;
use crate::app::refresh::RefreshPhase;
use crate::app::repos::repo_name;
use crate::app::{App, Focus, InputMode};
use crate::git::Host;

/// Compute the display width of a list of spans
fn spans_width(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}

/// Render the top status bar
///
///   repo · branch · filter                  ⟳ loading  ◉ watching  N commits
pub fn render_top_bar<H: Host>(f: &mut Frame, area: Rect, app: &App<H>) {
    let state = app.store.state();
    let bar_width = area.width as usize;
    let panel_bg = Style::default().bg(styles::PANEL);

    let mut left: Vec<Span> = Vec::new();
    match app.store.current_repo() {
        Some(repo) => {
            left.push(Span::styled(
                format!(" {}", repo_name(repo)),
                Style::default().fg(styles::BRIGHT).add_modifier(Modifier::BOLD),
            ));
            let branch = state.branch_head.as_deref().unwrap_or("(detached)");
            left.push(Span::styled(" · ", styles::dim_style()));
            left.push(Span::styled(branch.to_string(), Style::default().fg(styles::GREEN)));
            let filter = match &state.branch_filter {
                Some(filter) if !filter.is_all() => filter.selected().join(", "),
                _ => "all branches".to_string(),
            };
            left.push(Span::styled(" · ", styles::dim_style()));
            left.push(Span::styled(filter, Style::default().fg(styles::MUTED)));
            if state.only_follow_first_parent {
                left.push(Span::styled(" · first-parent", Style::default().fg(styles::MUTED)));
            }
        }
        None => left.push(Span::styled(" no repository", styles::dim_style())),
    }

    let mut right: Vec<Span> = Vec::new();
    let phase = match app.refresh_state().phase() {
        RefreshPhase::Idle => None,
        RefreshPhase::RequestingRepoInfo | RefreshPhase::RequestingBoth => Some("repo info"),
        RefreshPhase::RequestingCommits => Some("commits"),
    };
    if let Some(phase) = phase {
        let label = if app.refresh_state().is_hard() {
            format!("⟳ loading {phase} ")
        } else {
            format!("⟳ refreshing {phase} ")
        };
        right.push(Span::styled(label, Style::default().fg(styles::YELLOW)));
    }
    if app.watching {
        right.push(Span::styled("◉ watching ", Style::default().fg(styles::GREEN)));
    }
    let more = if state.more_commits_available { "+" } else { "" };
    right.push(Span::styled(
        format!("{}{more} commits ", state.commits.len()),
        styles::dim_style(),
    ));

    let pad = bar_width.saturating_sub(spans_width(&left) + spans_width(&right));
    left.push(Span::raw(" ".repeat(pad)));
    left.extend(right);
    f.render_widget(Paragraph::new(Line::from(left)).style(panel_bg), area);
}

// ── Bottom bar ──

struct Hint {
    key: String,
    label: String,
}

impl Hint {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
    fn width(&self) -> usize {
        self.key.chars().count() + self.label.chars().count()
    }
}

fn build_hints<H: Host>(app: &App<H>) -> Vec<Hint> {
    let panel_open = app.store.state().panel.is_open();
    let mut hints = Vec::new();
    match app.focus {
        Focus::Panel if panel_open => {
            hints.push(Hint::new("j/k", " files "));
            hints.push(Hint::new("Enter", " open "));
            hints.push(Hint::new("␣", " reviewed "));
            hints.push(Hint::new("J/K", " scroll "));
            hints.push(Hint::new("Tab", " graph "));
            hints.push(Hint::new("Esc", " close "));
        }
        _ => {
            hints.push(Hint::new("j/k", " move "));
            hints.push(Hint::new("Enter", " details "));
            hints.push(Hint::new("v", " mark/compare "));
            hints.push(Hint::new("/", " find "));
            hints.push(Hint::new("n", " next "));
            hints.push(Hint::new("b", " branch filter "));
            hints.push(Hint::new("c", " checkout "));
            hints.push(Hint::new("s", " stash "));
            hints.push(Hint::new("D", " drop "));
            hints.push(Hint::new("F", " fetch "));
            hints.push(Hint::new("p", " repos "));
            if panel_open {
                hints.push(Hint::new("Tab", " panel "));
            }
        }
    }
    if panel_open {
        hints.push(Hint::new("M", " menu "));
    }
    hints.push(Hint::new("r", " refresh "));
    hints.push(Hint::new("q", " quit "));
    hints
}

/// Pack hints into rows that fit within `width`, returns vec of Lines
fn pack_hint_lines(hints: &[Hint], width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_spans: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 1; // leading space

    for hint in hints {
        let hw = hint.width();
        if current_w + hw > width && !current_spans.is_empty() {
            lines.push(Line::from(current_spans));
            current_spans = Vec::new();
            current_w = 1;
        }
        if current_spans.is_empty() {
            current_spans.push(Span::raw(" "));
        }
        current_spans.push(Span::styled(hint.key.clone(), styles::key_hint_style()));
        current_spans.push(Span::styled(hint.label.clone(), styles::dim_style()));
        current_w += hw;
    }
    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }
    if lines.is_empty() {
        lines.push(Line::from(vec![Span::raw(" ")]));
    }
    lines
}

/// Calculate how many rows the bottom bar needs
pub fn bottom_bar_height<H: Host>(app: &App<H>, width: u16) -> u16 {
    match &app.input_mode {
        InputMode::Find | InputMode::Confirm(_) | InputMode::PickRepo(_) => 1,
        InputMode::Normal => {
            let lines = pack_hint_lines(&build_hints(app), width as usize);
            (lines.len() as u16).max(1)
        }
    }
}

/// Render the bottom keybinding hints bar
pub fn render_bottom_bar<H: Host>(f: &mut Frame, area: Rect, app: &App<H>) {
    let panel_bg = Style::default().bg(styles::PANEL);

    match &app.input_mode {
        InputMode::Find => {
            let spans = vec![
                Span::styled(" / ", Style::default().fg(styles::BG).bg(styles::YELLOW)),
                Span::styled(format!(" {}", app.find_input), Style::default().fg(styles::TEXT)),
                Span::styled("█", Style::default().fg(styles::YELLOW)),
                Span::styled("  Enter find · Esc cancel", styles::dim_style()),
            ];
            f.render_widget(Paragraph::new(Line::from(spans)).style(panel_bg), area);
        }
        InputMode::PickRepo(_) => {
            let spans = vec![
                Span::styled(" j/k", styles::key_hint_style()),
                Span::styled(" move ", styles::dim_style()),
                Span::styled("Enter", styles::key_hint_style()),
                Span::styled(" open ", styles::dim_style()),
                Span::styled("Esc", styles::key_hint_style()),
                Span::styled(" cancel", styles::dim_style()),
            ];
            f.render_widget(Paragraph::new(Line::from(spans)).style(panel_bg), area);
        }
        InputMode::Confirm(_) => {
            let spans = vec![
                Span::styled(
                    " ⚠ ",
                    Style::default()
                        .fg(styles::BG)
                        .bg(styles::YELLOW)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" Confirm (y/n) ", Style::default().fg(styles::YELLOW)),
            ];
            f.render_widget(Paragraph::new(Line::from(spans)).style(panel_bg), area);
        }
        InputMode::Normal => {
            let lines = pack_hint_lines(&build_hints(app), area.width as usize);
            let lines: Vec<Line> = lines.into_iter().take(area.height.max(1) as usize).collect();
            f.render_widget(Paragraph::new(lines).style(panel_bg), area);
        }
    }
}

/// Render the transient notification in the top-right corner
pub fn render_notification(f: &mut Frame, area: Rect, message: &str) {
    let notif_width = message.chars().count() as u16 + 4;
    let notif_x = area.x + area.width.saturating_sub(notif_width + 2);
    let notif_y = area.y + 2;

    let notif_area = Rect {
        x: notif_x,
        y: notif_y.min(area.bottom().saturating_sub(1)),
        width: notif_width.min(area.width),
        height: 1,
    };

    let notif = Paragraph::new(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(styles::GREEN)),
        Span::styled(message, Style::default().fg(styles::TEXT)),
        Span::raw(" "),
    ]))
    .style(Style::default().bg(styles::PANEL).fg(styles::TEXT));

    f.render_widget(notif, notif_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_wrap_to_width() {
        let hints = vec![
            Hint::new("j/k", " move "),
            Hint::new("Enter", " details "),
            Hint::new("q", " quit "),
        ];
        assert_eq!(pack_hint_lines(&hints, 80).len(), 1);
        assert_eq!(pack_hint_lines(&hints, 16).len(), 3);
    }

    #[test]
    fn empty_hints_still_yield_a_row() {
        assert_eq!(pack_hint_lines(&[], 40).len(), 1);
    }
}
