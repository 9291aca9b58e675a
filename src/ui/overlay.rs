use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::styles;
use crate::app::errors::ErrorNotice;
use crate::app::panel::PanelMenu;
use crate::app::repos::RepoOption;
use crate::app::ConfirmAction;
use crate::git::{abbrev_hash, Action};

fn confirm_prompt(action: &ConfirmAction) -> String {
    let ConfirmAction::RunAction(action) = action;
    match action {
        Action::CheckoutCommit { hash } => format!(
            "Checkout commit {}? This leaves the repository in a detached HEAD state.",
            abbrev_hash(hash)
        ),
        Action::Reset { hash, mode } => format!("Reset the current branch to {} ({mode:?})?", abbrev_hash(hash)),
        Action::DropCommit { hash } => format!("Drop commit {}? This rewrites history.", abbrev_hash(hash)),
        Action::DropStash { selector } => format!("Drop {selector}? The stash cannot be recovered."),
        Action::CleanUntrackedFiles { directories: true } => {
            "Delete all untracked files and directories?".to_string()
        }
        Action::CleanUntrackedFiles { directories: false } => "Delete all untracked files?".to_string(),
        other => format!("{}?", other.failure_message().trim_start_matches("Unable to ")),
    }
}

/// Render the y/n prompt for an action awaiting confirmation
pub fn render_confirm(f: &mut Frame, area: Rect, action: &ConfirmAction) {
    let popup_width = 60u16.min(area.width.saturating_sub(4)).max(20);
    let popup = centered_rect(popup_width, 6, area);
    f.render_widget(Clear, popup);

    let ConfirmAction::RunAction(inner) = action;
    let always = matches!(inner, Action::CheckoutCommit { .. });
    let mut keys = vec![
        Span::styled(" y", styles::key_hint_style()),
        Span::styled(" yes  ", styles::dim_style()),
        Span::styled("n", styles::key_hint_style()),
        Span::styled(" no", styles::dim_style()),
    ];
    if always {
        keys.push(Span::styled("  a", styles::key_hint_style()));
        keys.push(Span::styled(" always", styles::dim_style()));
    }

    let block = Block::default()
        .title(Span::styled(" CONFIRM ", Style::default().fg(styles::YELLOW)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::YELLOW))
        .style(Style::default().bg(styles::PANEL));
    let text = vec![
        Line::from(Span::styled(confirm_prompt(action), Style::default().fg(styles::TEXT))),
        Line::from(""),
        Line::from(keys),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), popup);
}

/// Render an error notice; notices that can be retried say so
pub fn render_error(f: &mut Frame, area: Rect, notice: &ErrorNotice) {
    let popup_width = 70u16.min(area.width.saturating_sub(4)).max(20);
    let body_lines = notice.message.lines().count() as u16;
    let popup_height = (body_lines + 5).min(area.height.saturating_sub(2)).max(5);
    let popup = centered_rect(popup_width, popup_height, area);
    f.render_widget(Clear, popup);

    let hint = if notice.retry_hard_refresh {
        vec![
            Span::styled(" r", styles::key_hint_style()),
            Span::styled(" retry  ", styles::dim_style()),
            Span::styled("Esc", styles::key_hint_style()),
            Span::styled(" dismiss", styles::dim_style()),
        ]
    } else {
        vec![
            Span::styled(" Esc", styles::key_hint_style()),
            Span::styled(" dismiss", styles::dim_style()),
        ]
    };

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", notice.title),
            Style::default().fg(styles::RED).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::RED))
        .style(Style::default().bg(styles::PANEL));

    let mut lines: Vec<Line> = notice
        .message
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(styles::TEXT))))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(hint));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), popup);
}

/// Render the context menu bound to the panel
pub fn render_panel_menu(f: &mut Frame, area: Rect, menu: PanelMenu, reviewing: bool) {
    let entries: Vec<(&str, &str)> = match menu {
        PanelMenu::Summary => {
            let review = if reviewing {
                ("E", "end code review")
            } else {
                ("R", "start code review")
            };
            vec![("c", "checkout"), review, ("x", "close panel")]
        }
        PanelMenu::File(_) => vec![("Enter", "view file"), ("Space", "toggle reviewed")],
    };

    let popup_height = entries.len() as u16 + 2;
    let popup = centered_rect(32u16.min(area.width), popup_height, area);
    f.render_widget(Clear, popup);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|(key, label)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {key:<6}"), styles::key_hint_style()),
                Span::styled(*label, Style::default().fg(styles::TEXT)),
            ]))
        })
        .collect();
    let block = Block::default()
        .title(Span::styled(" MENU (Esc=close) ", Style::default().fg(styles::CYAN)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::CYAN))
        .style(Style::default().bg(styles::PANEL));
    f.render_widget(List::new(items).block(block), popup);
}

/// Render the repository picker
pub fn render_repo_picker(f: &mut Frame, area: Rect, options: &[RepoOption], selected: usize, current: Option<&str>) {
    let popup_height = (options.len() as u16 + 2).min(area.height.saturating_sub(4)).max(3);
    let popup_width = 70u16.min(area.width.saturating_sub(4)).max(20);
    let popup = centered_rect(popup_width, popup_height, area);
    f.render_widget(Clear, popup);

    let items: Vec<ListItem> = options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let is_sel = idx == selected;
            let marker = if Some(option.path.as_str()) == current { "● " } else { "  " };
            let line = Line::from(vec![
                Span::styled(marker, Style::default().fg(styles::GREEN)),
                Span::styled(
                    format!("{:<24}", option.name),
                    Style::default().fg(if is_sel { styles::BRIGHT } else { styles::TEXT }),
                ),
                Span::styled(option.hint.clone(), Style::default().fg(styles::DIM)),
            ]);
            let style = if is_sel {
                styles::selected_style()
            } else {
                Style::default().bg(styles::PANEL)
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(
            " REPOSITORIES (Enter=open, Esc=close) ",
            Style::default().fg(styles::CYAN),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::CYAN))
        .style(Style::default().bg(styles::PANEL));
    f.render_widget(List::new(items).block(block), popup);
}

/// Calculate a centered rectangle within an area
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(r.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}
