use crate::app::index::CommitIndex;
use crate::git::Commit;

// ── Types ──

/// Where a commit's dot is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub lane: usize,
    pub color: usize,
}

/// A line leaving row `r` at `from_lane` and arriving at row `r + 1` in `to_lane`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from_lane: usize,
    pub to_lane: usize,
    pub color: usize,
}

impl Segment {
    pub fn is_straight(&self) -> bool {
        self.from_lane == self.to_lane
    }
}

/// A child → parent connection. `points` is the polyline of `(row, lane)`
/// corners; it ends one row past the last commit when the parent is not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub child_row: usize,
    pub parent: String,
    pub parent_row: Option<usize>,
    pub color: usize,
    pub points: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub palette_size: usize,
    pub only_follow_first_parent: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            palette_size: 8,
            only_follow_first_parent: false,
        }
    }
}

/// Result of laying out an ordered commit list (row 0 = newest).
#[derive(Debug, Clone, Default)]
pub struct GraphLayout {
    vertices: Vec<Vertex>,
    segments: Vec<Vec<Segment>>,
    edges: Vec<Edge>,
    lane_counts: Vec<usize>,
    droppable: Vec<bool>,
    max_lanes: usize,
}

impl GraphLayout {
    pub fn vertex(&self, row: usize) -> Option<Vertex> {
        self.vertices.get(row).copied()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Segments leaving `row` towards `row + 1`
    pub fn segments(&self, row: usize) -> &[Segment] {
        self.segments.get(row).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Lanes present at `row`: the vertex lane plus lanes passing through it.
    /// Lanes converging into the vertex are not counted.
    pub fn lanes_at_row(&self, row: usize) -> usize {
        self.lane_counts.get(row).copied().unwrap_or(0)
    }

    /// Widest the graph gets anywhere in the window
    pub fn max_lanes(&self) -> usize {
        self.max_lanes
    }

    pub fn is_droppable(&self, row: usize) -> bool {
        self.droppable.get(row).copied().unwrap_or(false)
    }

    pub fn rows(&self) -> usize {
        self.vertices.len()
    }
}

// ── Layout ──

struct OpenLane {
    awaiting: String,
    color: usize,
    edges: Vec<usize>,
}

struct PendingEdge {
    child_row: usize,
    start_lane: usize,
    lane: usize,
    parent: String,
    color: usize,
    end: Option<(usize, usize)>,
}

/// Assign every commit a lane and color and compute the connecting lines.
///
/// Deterministic in the ordered list and its parent pointers: laying out a
/// prefix of the list yields the same vertices for every row of the prefix.
pub fn compute(commits: &[Commit], index: &CommitIndex, opts: &LayoutOptions) -> GraphLayout {
    let palette = opts.palette_size.max(1);
    let mut lanes: Vec<Option<OpenLane>> = Vec::new();
    let mut pending: Vec<PendingEdge> = Vec::new();
    let mut vertices = Vec::with_capacity(commits.len());
    let mut lane_counts = Vec::with_capacity(commits.len());
    let mut max_lanes = 0;
    let mut cursor = 0;

    for (row, commit) in commits.iter().enumerate() {
        let awaiting: Vec<usize> = lanes
            .iter()
            .enumerate()
            .filter_map(|(slot, lane)| match lane {
                Some(lane) if lane.awaiting == commit.hash => Some(slot),
                _ => None,
            })
            .collect();
        let open = lanes.iter().filter(|l| l.is_some()).count();
        lane_counts.push(open - awaiting.len() + 1);

        // Slots freed by converging lanes on this row, with the color they carried
        let mut closed_here: Vec<(usize, usize)> = Vec::new();

        let vertex = match awaiting.first() {
            Some(&first) => {
                let color = lanes[first].as_ref().map(|l| l.color).unwrap_or(0);
                for &slot in &awaiting {
                    if let Some(lane) = lanes[slot].take() {
                        for e in lane.edges {
                            pending[e].end = Some((row, first));
                        }
                        if slot != first {
                            closed_here.push((slot, lane.color));
                        }
                    }
                }
                Vertex { lane: first, color }
            }
            None => {
                let slot = first_free(&lanes);
                let color = pick_color(&lanes, slot, &closed_here, palette, &mut cursor);
                Vertex { lane: slot, color }
            }
        };
        vertices.push(vertex);

        let mut parents = commit.parents.iter();
        if let Some(first_parent) = parents.next() {
            let e = pending.len();
            pending.push(PendingEdge {
                child_row: row,
                start_lane: vertex.lane,
                lane: vertex.lane,
                parent: first_parent.clone(),
                color: vertex.color,
                end: None,
            });
            occupy(
                &mut lanes,
                vertex.lane,
                OpenLane {
                    awaiting: first_parent.clone(),
                    color: vertex.color,
                    edges: vec![e],
                },
            );
        }

        if !opts.only_follow_first_parent {
            for parent in parents {
                let e = pending.len();
                let joined = lanes
                    .iter()
                    .position(|l| matches!(l, Some(l) if &l.awaiting == parent));
                let (slot, color) = match joined {
                    Some(slot) => {
                        let mut color = 0;
                        if let Some(lane) = lanes[slot].as_mut() {
                            lane.edges.push(e);
                            color = lane.color;
                        }
                        (slot, color)
                    }
                    None => {
                        let slot = first_free(&lanes);
                        let color = pick_color(&lanes, slot, &closed_here, palette, &mut cursor);
                        occupy(
                            &mut lanes,
                            slot,
                            OpenLane {
                                awaiting: parent.clone(),
                                color,
                                edges: vec![e],
                            },
                        );
                        (slot, color)
                    }
                };
                pending.push(PendingEdge {
                    child_row: row,
                    start_lane: vertex.lane,
                    lane: slot,
                    parent: parent.clone(),
                    color,
                    end: None,
                });
            }
        }

        let occupied = lanes.iter().rposition(|l| l.is_some()).map_or(0, |i| i + 1);
        max_lanes = max_lanes.max(vertex.lane + 1).max(occupied);
    }

    let bottom = commits.len();
    let edges: Vec<Edge> = pending.into_iter().map(|p| finish_edge(p, bottom)).collect();
    let segments = segments_from_edges(&edges, commits.len());

    GraphLayout {
        vertices,
        segments,
        edges,
        lane_counts,
        droppable: drop_eligibility(commits, index),
        max_lanes,
    }
}

fn first_free(lanes: &[Option<OpenLane>]) -> usize {
    lanes.iter().position(|l| l.is_none()).unwrap_or(lanes.len())
}

fn occupy(lanes: &mut Vec<Option<OpenLane>>, slot: usize, lane: OpenLane) {
    if slot >= lanes.len() {
        lanes.resize_with(slot + 1, || None);
    }
    lanes[slot] = Some(lane);
}

/// Next palette color, skipping the colors of the neighbouring open lanes and
/// of any lane that closed on this slot in the same row. Falls back to the
/// cursor when the palette is too small to avoid them all.
fn pick_color(
    lanes: &[Option<OpenLane>],
    slot: usize,
    closed_here: &[(usize, usize)],
    palette: usize,
    cursor: &mut usize,
) -> usize {
    let mut avoid: Vec<usize> = Vec::new();
    let neighbours = [slot.checked_sub(1), Some(slot + 1)];
    for n in neighbours.into_iter().flatten() {
        if let Some(Some(lane)) = lanes.get(n) {
            avoid.push(lane.color);
        }
    }
    avoid.extend(closed_here.iter().filter(|(s, _)| *s == slot).map(|(_, c)| *c));

    let chosen = (0..palette)
        .map(|k| (*cursor + k) % palette)
        .find(|c| !avoid.contains(c))
        .unwrap_or(*cursor % palette);
    *cursor = (chosen + 1) % palette;
    chosen
}

fn finish_edge(p: PendingEdge, bottom: usize) -> Edge {
    let mut points = vec![(p.child_row, p.start_lane)];
    match p.end {
        Some((end_row, end_lane)) => {
            if p.lane != p.start_lane && p.child_row + 1 < end_row {
                points.push((p.child_row + 1, p.lane));
            }
            let last_row = points.last().map_or(p.child_row, |pt| pt.0);
            if p.lane != end_lane && end_row - 1 > last_row {
                points.push((end_row - 1, p.lane));
            }
            points.push((end_row, end_lane));
        }
        None => {
            if p.lane != p.start_lane {
                points.push((p.child_row + 1, p.lane));
            }
            let last_row = points.last().map_or(p.child_row, |pt| pt.0);
            if bottom > last_row {
                points.push((bottom, p.lane));
            }
        }
    }
    Edge {
        child_row: p.child_row,
        parent: p.parent,
        parent_row: p.end.map(|(row, _)| row),
        color: p.color,
        points,
    }
}

/// Split every edge polyline into per-row segments. Edges sharing a lane
/// produce the same segment; it is kept once.
fn segments_from_edges(edges: &[Edge], rows: usize) -> Vec<Vec<Segment>> {
    let mut segments: Vec<Vec<Segment>> = vec![Vec::new(); rows];
    for edge in edges {
        for pair in edge.points.windows(2) {
            let (from_row, from_lane) = pair[0];
            let (to_row, to_lane) = pair[1];
            for row in from_row..to_row.min(rows) {
                let seg = Segment {
                    from_lane: if row == from_row { from_lane } else { to_lane },
                    to_lane,
                    color: edge.color,
                };
                let existing = &mut segments[row];
                if !existing
                    .iter()
                    .any(|s| s.from_lane == seg.from_lane && s.to_lane == seg.to_lane)
                {
                    existing.push(seg);
                }
            }
        }
    }
    segments
}

// ── Drop eligibility ──

/// A commit can be dropped when it has at most one parent, is neither the
/// uncommitted sentinel nor a stash, and its loaded descendants form a single
/// chain free of merges. A commit with two children is a branch point and a
/// non-first parent always has a merge child, so both are rejected. Stash rows
/// are not treated as descendants.
fn drop_eligibility(commits: &[Commit], index: &CommitIndex) -> Vec<bool> {
    let rows = commits.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows];

    for (row, commit) in commits.iter().enumerate() {
        if commit.is_stash() {
            continue;
        }
        for parent in &commit.parents {
            if let Some(parent_row) = index.get(parent) {
                children[parent_row].push(row);
            }
        }
    }

    // Children sit above their parents, so a single top-down pass suffices
    let mut linear_above = vec![false; rows];
    for row in 0..rows {
        linear_above[row] = !commits[row].is_merge()
            && match children[row].as_slice() {
                [] => true,
                [child] => linear_above[*child],
                _ => false,
            };
    }

    commits
        .iter()
        .enumerate()
        .map(|(row, c)| !c.is_uncommitted() && !c.is_stash() && linear_above[row])
        .collect()
}
