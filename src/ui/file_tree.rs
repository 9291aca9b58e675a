use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::styles;
use crate::app::file_tree::NodeKind;
use crate::app::panel::ExpandedCommit;
use crate::app::{App, Focus};
use crate::git::{FileStatus, Host};

/// Render the changed-file tree of the open panel
pub fn render<H: Host>(f: &mut Frame, area: Rect, app: &App<H>, expanded: &ExpandedCommit) {
    let focused = app.focus == Focus::Panel;
    let border = if focused { styles::CYAN } else { styles::BORDER };

    let count = expanded.file_changes.as_ref().map_or(0, |c| c.len());
    let title = match &expanded.code_review {
        Some(review) => format!(
            " FILES ({count}) · reviewing, {} left ",
            review.remaining_files.len()
        ),
        None => format!(" FILES ({count}) "),
    };
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(styles::CYAN)))
        .borders(Borders::TOP)
        .border_style(Style::default().fg(border))
        .style(styles::surface_style());

    let Some(tree) = &expanded.file_tree else {
        let text = if expanded.loading { "  Loading…" } else { "  No files" };
        f.render_widget(
            List::new(vec![ListItem::new(Span::styled(text, styles::dim_style()))]).block(block),
            area,
        );
        return;
    };

    let rows = tree.visible_rows();
    let viewport = area.height.saturating_sub(1) as usize;
    let cursor = app.panel_cursor.min(rows.len().saturating_sub(1));
    let scroll = if cursor >= viewport {
        cursor + 1 - viewport
    } else {
        0
    };
    let width = area.width as usize;
    let reviewing = expanded.code_review.is_some();

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(scroll)
        .take(viewport)
        .map(|(pos, &(depth, id))| {
            let node = tree.node(id);
            let indent = "  ".repeat(depth);
            let mut spans = vec![Span::raw(format!(" {indent}"))];

            match &node.kind {
                NodeKind::Folder { open, .. } => {
                    let arrow = if *open { "▾ " } else { "▸ " };
                    spans.push(Span::styled(arrow, styles::dim_style()));
                    spans.push(Span::styled(
                        format!("{}/", node.name),
                        Style::default().fg(styles::BLUE),
                    ));
                }
                NodeKind::Repo { .. } => {
                    spans.push(Span::styled("⎇ ", Style::default().fg(styles::PURPLE)));
                    spans.push(Span::styled(node.name.clone(), Style::default().fg(styles::PURPLE)));
                }
                NodeKind::File { change } => {
                    let change = expanded.file_changes.as_ref().and_then(|c| c.get(*change));
                    if reviewing {
                        let (mark, style) = if node.reviewed {
                            ("✓ ", Style::default().fg(styles::GREEN))
                        } else {
                            ("○ ", styles::dim_style())
                        };
                        spans.push(Span::styled(mark, style));
                    }
                    if let Some(change) = change {
                        let style = match change.status {
                            FileStatus::Added | FileStatus::Untracked => styles::status_added(),
                            FileStatus::Deleted => styles::status_deleted(),
                            FileStatus::Modified | FileStatus::Renamed => styles::status_modified(),
                        };
                        spans.push(Span::styled(format!("{} ", change.status.symbol()), style));
                    }
                    let used = indent.len() + 8;
                    let is_last_viewed = expanded.last_viewed_file.as_deref() == Some(node.path.as_str());
                    let name_style = if is_last_viewed {
                        Style::default().fg(styles::BRIGHT)
                    } else {
                        Style::default().fg(styles::TEXT)
                    };
                    spans.push(Span::styled(
                        shorten_path(&node.name, width.saturating_sub(used + 10)),
                        name_style,
                    ));
                    if let Some(change) = change {
                        if let (Some(add), Some(del)) = (change.additions, change.deletions) {
                            spans.push(Span::styled(format!(" +{add}"), Style::default().fg(styles::GREEN)));
                            spans.push(Span::styled(format!(" -{del}"), Style::default().fg(styles::RED)));
                        }
                        if change.status == FileStatus::Renamed {
                            spans.push(Span::styled(
                                format!(" ← {}", change.old_path),
                                styles::dim_style(),
                            ));
                        }
                    }
                }
            }

            let style = if focused && pos == cursor {
                styles::selected_style()
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

/// Shorten a file path to fit within max_width
fn shorten_path(path: &str, max_width: usize) -> String {
    if path.chars().count() <= max_width {
        return path.to_string();
    }

    // Try to show just the filename
    if let Some(name) = path.rsplit('/').next() {
        let name_len = name.chars().count();
        if name_len <= max_width {
            let remaining = max_width.saturating_sub(name_len + 4);
            if remaining > 0 {
                let dir_part: String = path[..path.len() - name.len() - 1]
                    .chars()
                    .take(remaining)
                    .collect();
                return format!("{dir_part}…/{name}");
            }
            return name.to_string();
        }
        let truncated: String = name.chars().take(max_width.saturating_sub(1)).collect();
        return format!("{truncated}…");
    }

    let truncated: String = path.chars().take(max_width.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_path_returned_as_is() {
        assert_eq!(shorten_path("src/main.rs", 20), "src/main.rs");
    }

    #[test]
    fn long_path_keeps_filename() {
        let out = shorten_path("src/very/deep/directory/structure/file.rs", 20);
        assert!(out.ends_with("/file.rs"), "got {out}");
        assert!(out.chars().count() <= 20);
    }

    #[test]
    fn filename_longer_than_width_is_truncated() {
        assert_eq!(shorten_path("a_really_long_file_name.rs", 8), "a_reall…");
    }

    #[test]
    fn zero_width_does_not_panic() {
        assert_eq!(shorten_path("dir/file.rs", 0), "…");
    }
}
