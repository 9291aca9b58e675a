use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use super::styles;
use super::utils::{now_secs, relative_age, word_wrap};
use super::{file_tree, graph};
use crate::app::panel::ExpandedCommit;
use crate::app::App;
use crate::git::{abbrev_hash, Host, UNCOMMITTED};

/// Render the detail/comparison panel (right side, when a commit is expanded)
pub fn render<H: Host>(f: &mut Frame, area: Rect, app: &App<H>) {
    let Some(expanded) = app.store.state().panel.expanded() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(styles::BORDER))
        .style(styles::surface_style())
        .padding(Padding::new(0, 1, 0, 0));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Min(3)])
        .split(inner);

    render_summary(f, split[0], app, expanded);
    file_tree::render(f, split[1], app, expanded);
}

fn render_summary<H: Host>(f: &mut Frame, area: Rect, app: &App<H>, expanded: &ExpandedCommit) {
    let width = area.width.saturating_sub(1) as usize;
    let mut lines: Vec<Line> = Vec::new();

    let heading = match &expanded.compare_with_hash {
        Some(other) => format!(
            " COMPARE {} ↔ {}",
            short(other),
            short(&expanded.commit_hash)
        ),
        None => format!(" COMMIT {}", short(&expanded.commit_hash)),
    };
    lines.push(Line::from(Span::styled(
        heading,
        Style::default().fg(styles::PURPLE).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(Span::styled(
        "─".repeat(width),
        Style::default().fg(styles::BORDER),
    )));

    if expanded.loading && expanded.details.is_none() && expanded.file_changes.is_none() {
        lines.push(Line::from(Span::styled(" Loading…", styles::dim_style())));
    } else if let Some(details) = &expanded.details {
        let label = |k: &str| Span::styled(format!(" {k:<10}"), Style::default().fg(styles::MUTED));
        lines.push(Line::from(vec![
            label("Hash"),
            Span::styled(details.hash.clone(), Style::default().fg(styles::TEXT)),
        ]));
        if !details.parents.is_empty() {
            let parents: Vec<&str> = details.parents.iter().map(|p| abbrev_hash(p)).collect();
            lines.push(Line::from(vec![
                label("Parents"),
                Span::styled(parents.join(", "), Style::default().fg(styles::TEXT)),
            ]));
        }
        lines.push(Line::from(vec![
            label("Author"),
            Span::styled(
                format!("{} <{}>", details.author, details.email),
                Style::default().fg(styles::TEXT),
            ),
        ]));
        if details.committer != details.author {
            lines.push(Line::from(vec![
                label("Committer"),
                Span::styled(details.committer.clone(), Style::default().fg(styles::TEXT)),
            ]));
        }
        lines.push(Line::from(vec![
            label("Date"),
            Span::styled(relative_age(details.date, now_secs()), Style::default().fg(styles::TEXT)),
        ]));
        if let Some(commit) = app.store.commit(&expanded.commit_hash) {
            let glyph = graph::vertex_glyph(commit);
            if !commit.heads.is_empty() || !commit.tags.is_empty() {
                let mut refs: Vec<String> = commit.heads.clone();
                refs.extend(commit.tags.iter().map(|t| t.name.clone()));
                lines.push(Line::from(vec![
                    label("Refs"),
                    Span::styled(format!("{glyph} {}", refs.join(", ")), styles::head_label()),
                ]));
            }
        }
        lines.push(Line::from(""));
        for line in word_wrap(details.body.trim_end(), width.saturating_sub(1)) {
            lines.push(Line::from(Span::styled(
                format!(" {line}"),
                Style::default().fg(styles::BRIGHT),
            )));
        }
    } else if let Some(changes) = &expanded.file_changes {
        let (added, removed) = changes.iter().fold((0, 0), |(a, d), c| {
            (a + c.additions.unwrap_or(0), d + c.deletions.unwrap_or(0))
        });
        lines.push(Line::from(vec![
            Span::styled(format!(" {} files changed", changes.len()), Style::default().fg(styles::TEXT)),
            Span::styled(format!("  +{added}"), Style::default().fg(styles::GREEN)),
            Span::styled(format!(" -{removed}"), Style::default().fg(styles::RED)),
        ]));
    }

    if let Some(review) = &expanded.code_review {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" Code review in progress: {} file(s) remaining", review.remaining_files.len()),
            Style::default().fg(styles::YELLOW),
        )));
    }

    let paragraph = Paragraph::new(lines).scroll((expanded.scroll.summary as u16, 0));
    f.render_widget(paragraph, area);
}

fn short(hash: &str) -> String {
    if hash == UNCOMMITTED {
        "working tree".to_string()
    } else {
        abbrev_hash(hash).to_string()
    }
}
