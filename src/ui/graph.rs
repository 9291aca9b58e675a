use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use super::styles;
use super::utils::{now_secs, relative_age, truncate};
use crate::app::App;
use crate::config::GraphStyle;
use crate::git::{Commit, Host};
use crate::graph::GraphLayout;

// ── Glyphs ──

/// One terminal cell of the graph column. `color` is a palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub color: Option<usize>,
    rank: u8,
}

const EMPTY: Cell = Cell {
    glyph: ' ',
    color: None,
    rank: 0,
};

// Later ranks win when two strokes meet in one cell
const HORIZONTAL: u8 = 1;
const VERTICAL: u8 = 2;
const CORNER: u8 = 3;
const VERTEX: u8 = 4;

struct Corners {
    /// From above, turning left
    up_left: char,
    /// From above, turning right
    up_right: char,
    /// From the left, turning down
    left_down: char,
    /// From the right, turning down
    right_down: char,
}

const ROUNDED: Corners = Corners {
    up_left: '╯',
    up_right: '╰',
    left_down: '╮',
    right_down: '╭',
};

const ANGULAR: Corners = Corners {
    up_left: '┘',
    up_right: '└',
    left_down: '┐',
    right_down: '┌',
};

fn corners(style: GraphStyle) -> &'static Corners {
    match style {
        GraphStyle::Rounded => &ROUNDED,
        GraphStyle::Angular => &ANGULAR,
    }
}

pub fn vertex_glyph(commit: &Commit) -> char {
    if commit.is_uncommitted() {
        '○'
    } else if commit.is_stash() {
        '◆'
    } else {
        '●'
    }
}

/// A corner meeting a vertical line in the same cell becomes a tee
fn tee(cell: &Cell, glyph: char, rank: u8) -> Option<char> {
    let corner = match (cell.rank, rank) {
        (VERTICAL, CORNER) => glyph,
        (CORNER, VERTICAL) => cell.glyph,
        _ => return None,
    };
    match corner {
        '╭' | '╰' | '┌' | '└' => Some('├'),
        '╮' | '╯' | '┐' | '┘' => Some('┤'),
        _ => None,
    }
}

struct Canvas {
    cells: Vec<Cell>,
}

impl Canvas {
    fn put(&mut self, col: usize, glyph: char, color: usize, rank: u8) {
        if let Some(cell) = self.cells.get_mut(col) {
            if let Some(joined) = tee(cell, glyph, rank) {
                *cell = Cell {
                    glyph: joined,
                    color: cell.color.or(Some(color)),
                    rank: CORNER,
                };
            } else if rank >= cell.rank {
                *cell = Cell {
                    glyph,
                    color: Some(color),
                    rank,
                };
            }
        }
    }

    fn lane(&mut self, lane: usize, glyph: char, color: usize, rank: u8) {
        self.put(lane * 2, glyph, color, rank);
    }

    /// Horizontal run strictly between two lanes
    fn span(&mut self, a: usize, b: usize, color: usize) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        for col in lo * 2 + 1..hi * 2 {
            self.put(col, '─', color, HORIZONTAL);
        }
    }
}

/// Graph cells for `row`, two columns per lane (glyph then spacer).
/// Lines arriving from the row above are drawn into this row; a line
/// leaving the vertex sideways turns down on this row too.
pub fn row_cells(layout: &GraphLayout, row: usize, lanes: usize, glyph: char, style: GraphStyle) -> Vec<Cell> {
    let c = corners(style);
    let mut canvas = Canvas {
        cells: vec![EMPTY; lanes * 2],
    };
    let Some(vertex) = layout.vertex(row) else {
        return canvas.cells;
    };

    if row > 0 {
        let above = layout.vertex(row - 1).map(|v| v.lane);
        for seg in layout.segments(row - 1) {
            // A line that branched off the row above already made its turn there
            if seg.is_straight() || Some(seg.from_lane) == above {
                canvas.lane(seg.to_lane, '│', seg.color, VERTICAL);
                continue;
            }
            let (from_corner, to_corner) = if seg.to_lane < seg.from_lane {
                (c.up_left, c.right_down)
            } else {
                (c.up_right, c.left_down)
            };
            canvas.lane(seg.from_lane, from_corner, seg.color, CORNER);
            canvas.span(seg.from_lane, seg.to_lane, seg.color);
            if seg.to_lane != vertex.lane {
                canvas.lane(seg.to_lane, to_corner, seg.color, CORNER);
            }
        }
    }

    for seg in layout.segments(row) {
        if seg.from_lane != vertex.lane || seg.is_straight() {
            continue;
        }
        let turn = if seg.to_lane > seg.from_lane {
            c.left_down
        } else {
            c.right_down
        };
        canvas.span(seg.from_lane, seg.to_lane, seg.color);
        canvas.lane(seg.to_lane, turn, seg.color, CORNER);
    }

    canvas.lane(vertex.lane, glyph, vertex.color, VERTEX);
    canvas.cells
}

/// Plain-text rendering of [`row_cells`]
pub fn row_text(layout: &GraphLayout, row: usize, lanes: usize, glyph: char, style: GraphStyle) -> String {
    row_cells(layout, row, lanes, glyph, style)
        .iter()
        .map(|c| c.glyph)
        .collect()
}

// ── Commit list ──

fn ref_labels(commit: &Commit) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for head in &commit.heads {
        spans.push(Span::styled(format!("[{head}] "), styles::head_label()));
    }
    for remote in &commit.remotes {
        spans.push(Span::styled(format!("[{}] ", remote.name), styles::remote_label()));
    }
    for tag in &commit.tags {
        spans.push(Span::styled(format!("<{}> ", tag.name), styles::tag_label()));
    }
    if let Some(stash) = &commit.stash {
        spans.push(Span::styled(format!("{} ", stash.selector), styles::stash_label()));
    }
    spans
}

pub fn render<H: Host>(f: &mut Frame, area: Rect, app: &App<H>) {
    let state = app.store.state();
    let layout = app.store.layout();
    let lanes = layout.max_lanes().max(1);
    let graph_style = app.config.graph.style;
    let now = now_secs();

    let title = match app.store.current_repo() {
        Some(repo) => format!(" {} ", crate::app::repos::repo_name(repo)),
        None => " no repository ".to_string(),
    };
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(styles::CYAN)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::BORDER))
        .style(styles::default_style());

    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    if state.commits.is_empty() {
        let text = if app.refresh_state().in_progress() || state.current_repo_loading {
            "  Loading…"
        } else {
            "  No commits"
        };
        let list = List::new(vec![ListItem::new(Span::styled(text, styles::dim_style()))]).block(block);
        f.render_widget(list, area);
        return;
    }

    let top = state.scroll_top.min(state.commits.len().saturating_sub(1));
    let end = (top + inner_height).min(state.commits.len());
    let mut items: Vec<ListItem> = Vec::with_capacity(end - top + 1);

    for row in top..end {
        let commit = &state.commits[row];
        let muted = app.store.is_muted(row);
        let cells = row_cells(layout, row, lanes, vertex_glyph(commit), graph_style);

        let mut spans: Vec<Span> = cells
            .iter()
            .map(|cell| {
                let color = match cell.color {
                    Some(_) if muted => styles::DIM,
                    Some(i) => styles::lane_color(i),
                    None => styles::DIM,
                };
                Span::styled(cell.glyph.to_string(), Style::default().fg(color))
            })
            .collect();
        spans.push(Span::raw(" "));
        spans.extend(ref_labels(commit));

        let meta = format!(
            "  {} · {} · {}",
            commit.author,
            relative_age(commit.date, now),
            commit.abbrev()
        );
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let room = inner_width.saturating_sub(used + meta.chars().count());
        let message_style = if muted {
            styles::dim_style()
        } else if commit.is_uncommitted() {
            Style::default().fg(styles::YELLOW).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(styles::TEXT)
        };
        spans.push(Span::styled(truncate(&commit.message, room), message_style));
        spans.push(Span::styled(meta, styles::dim_style()));

        let style = if row == app.selected {
            styles::selected_style()
        } else if app.compare_mark.as_deref() == Some(commit.hash.as_str()) {
            styles::marked_style()
        } else {
            Style::default()
        };
        items.push(ListItem::new(Line::from(spans)).style(style));
    }

    if end == state.commits.len() && state.more_commits_available && items.len() < inner_height {
        items.push(ListItem::new(Span::styled(
            "  ↓ more commits (m to load)",
            Style::default().fg(styles::MUTED),
        )));
    }

    f.render_widget(List::new(items).block(block), area);
}
