use crate::app::review::CodeReview;
use crate::git::FileChange;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Folder { children: Vec<usize>, open: bool },
    /// Index into the file-change list the tree was built from
    File { change: usize },
    /// A registered repository nested inside the current one
    Repo { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    /// Path relative to the repository root
    pub path: String,
    pub reviewed: bool,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    fn children(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Folder { children, .. } => children,
            _ => &[],
        }
    }
}

/// Changed files arranged by directory. Nodes live in a flat arena and point
/// back to their parent, so a file's ancestors are an index walk away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    nodes: Vec<Node>,
}

pub const ROOT: usize = 0;

impl FileTree {
    /// Build the tree for `changes` (keyed by their new path). Any path under
    /// one of `nested_repos` (absolute paths) collapses into a repo leaf.
    /// With a review, files still remaining start unreviewed.
    pub fn build(
        changes: &[FileChange],
        repo_root: &str,
        nested_repos: &[String],
        review: Option<&CodeReview>,
    ) -> Self {
        let mut tree = FileTree {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                path: String::new(),
                reviewed: true,
                kind: NodeKind::Folder {
                    children: Vec::new(),
                    open: true,
                },
            }],
        };

        for (i, change) in changes.iter().enumerate() {
            let segments: Vec<&str> = change.new_path.split('/').collect();
            let mut folder = ROOT;
            let mut abs_path = repo_root.trim_end_matches('/').to_string();
            for (j, seg) in segments.iter().enumerate() {
                abs_path.push('/');
                abs_path.push_str(seg);
                let rel_path = segments[..=j].join("/");

                if nested_repos.iter().any(|r| r == &abs_path) {
                    if tree.child_named(folder, seg).is_none() {
                        tree.push_child(
                            folder,
                            seg,
                            rel_path,
                            true,
                            NodeKind::Repo {
                                path: abs_path.clone(),
                            },
                        );
                    }
                    break;
                } else if j + 1 < segments.len() {
                    folder = match tree.child_named(folder, seg) {
                        Some(existing) if tree.nodes[existing].is_folder() => existing,
                        _ => tree.push_child(
                            folder,
                            seg,
                            rel_path,
                            true,
                            NodeKind::Folder {
                                children: Vec::new(),
                                open: true,
                            },
                        ),
                    };
                } else if !seg.is_empty() {
                    let reviewed = review.map_or(true, |r| !r.is_remaining(&change.new_path));
                    match tree.child_named(folder, seg) {
                        Some(existing) => {
                            tree.nodes[existing].kind = NodeKind::File { change: i };
                            tree.nodes[existing].reviewed = reviewed;
                        }
                        None => {
                            tree.push_child(folder, seg, rel_path, reviewed, NodeKind::File { change: i });
                        }
                    }
                }
            }
        }

        tree.sort_children();
        if review.is_some() {
            tree.recalc_folder(ROOT);
        }
        tree
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node(ROOT).children().is_empty()
    }

    /// Children of a folder: folders and repos first, then files, each by name
    pub fn children(&self, id: usize) -> &[usize] {
        self.nodes.get(id).map_or(&[], |n| n.children())
    }

    /// Locate a node by its relative path
    pub fn find(&self, path: &str) -> Option<usize> {
        let mut cur = ROOT;
        for seg in path.split('/') {
            cur = self.child_named(cur, seg)?;
        }
        Some(cur)
    }

    /// Set one file's reviewed flag and re-evaluate its ancestors, deepest
    /// first, stopping at the first folder whose flag is unchanged. Returns
    /// how many folders were re-evaluated.
    pub fn set_file_reviewed(&mut self, path: &str, reviewed: bool) -> usize {
        let Some(file) = self.find(path) else {
            return 0;
        };
        if !matches!(self.nodes[file].kind, NodeKind::File { .. }) {
            return 0;
        }
        self.nodes[file].reviewed = reviewed;

        let mut evaluated = 0;
        let mut cur = self.nodes[file].parent;
        while let Some(folder) = cur {
            evaluated += 1;
            let value = self.all_children_reviewed(folder);
            if self.nodes[folder].reviewed == value {
                break;
            }
            self.nodes[folder].reviewed = value;
            cur = self.nodes[folder].parent;
        }
        evaluated
    }

    /// Mark every file and folder
    pub fn set_all_reviewed(&mut self, reviewed: bool) {
        for node in &mut self.nodes {
            if !matches!(node.kind, NodeKind::Repo { .. }) {
                node.reviewed = reviewed;
            }
        }
    }

    /// New paths of every file, in display order
    pub fn file_paths(&self, changes: &[FileChange]) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_files(ROOT, changes, &mut out);
        out
    }

    pub fn toggle_folder(&mut self, id: usize) {
        if let Some(NodeKind::Folder { open, .. }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
            *open = !*open;
        }
    }

    /// `(depth, node)` for every node under an open folder, in display order
    pub fn visible_rows(&self) -> Vec<(usize, usize)> {
        let mut rows = Vec::new();
        self.collect_visible(ROOT, 0, &mut rows);
        rows
    }

    // ── Internal ──

    fn child_named(&self, folder: usize, name: &str) -> Option<usize> {
        self.children(folder)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    fn push_child(&mut self, parent: usize, name: &str, path: String, reviewed: bool, kind: NodeKind) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            path,
            reviewed,
            kind,
        });
        if let NodeKind::Folder { children, .. } = &mut self.nodes[parent].kind {
            children.push(id);
        }
        id
    }

    fn sort_children(&mut self) {
        let order: Vec<(usize, Vec<usize>)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_folder())
            .map(|(id, n)| {
                let mut sorted = n.children().to_vec();
                sorted.sort_by(|&a, &b| self.compare_entries(a, b));
                (id, sorted)
            })
            .collect();
        for (id, sorted) in order {
            if let NodeKind::Folder { children, .. } = &mut self.nodes[id].kind {
                *children = sorted;
            }
        }
    }

    fn compare_entries(&self, a: usize, b: usize) -> Ordering {
        let is_file = |id: usize| matches!(self.nodes[id].kind, NodeKind::File { .. });
        match (is_file(a), is_file(b)) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => {
                let (na, nb) = (&self.nodes[a].name, &self.nodes[b].name);
                na.to_lowercase().cmp(&nb.to_lowercase()).then_with(|| na.cmp(nb))
            }
        }
    }

    fn all_children_reviewed(&self, folder: usize) -> bool {
        self.children(folder)
            .iter()
            .all(|&c| matches!(self.nodes[c].kind, NodeKind::Repo { .. }) || self.nodes[c].reviewed)
    }

    fn recalc_folder(&mut self, folder: usize) -> bool {
        let children = self.children(folder).to_vec();
        let mut reviewed = true;
        for child in children {
            let value = match self.nodes[child].kind {
                NodeKind::Folder { .. } => self.recalc_folder(child),
                NodeKind::File { .. } => self.nodes[child].reviewed,
                NodeKind::Repo { .. } => true,
            };
            reviewed &= value;
        }
        self.nodes[folder].reviewed = reviewed;
        reviewed
    }

    fn collect_files(&self, folder: usize, changes: &[FileChange], out: &mut Vec<String>) {
        for &child in self.children(folder) {
            match self.nodes[child].kind {
                NodeKind::Folder { .. } => self.collect_files(child, changes, out),
                NodeKind::File { change } => {
                    if let Some(c) = changes.get(change) {
                        out.push(c.new_path.clone());
                    }
                }
                NodeKind::Repo { .. } => {}
            }
        }
    }

    fn collect_visible(&self, folder: usize, depth: usize, rows: &mut Vec<(usize, usize)>) {
        for &child in self.children(folder) {
            rows.push((depth, child));
            if let NodeKind::Folder { open: true, .. } = self.nodes[child].kind {
                self.collect_visible(child, depth + 1, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileStatus;

    fn make_change(path: &str) -> FileChange {
        FileChange {
            old_path: path.to_string(),
            new_path: path.to_string(),
            status: FileStatus::Modified,
            additions: Some(1),
            deletions: Some(1),
        }
    }

    fn make_changes(paths: &[&str]) -> Vec<FileChange> {
        paths.iter().map(|p| make_change(p)).collect()
    }

    fn make_review(remaining: &[&str]) -> CodeReview {
        CodeReview {
            id: "abc".to_string(),
            remaining_files: remaining.iter().map(|p| p.to_string()).collect(),
            last_viewed_file: None,
            last_active: 0,
        }
    }

    fn reviewed(tree: &FileTree, path: &str) -> bool {
        tree.find(path).map(|id| tree.node(id).reviewed).unwrap_or(false)
    }

    #[test]
    fn build_nests_paths_into_folders() {
        let changes = make_changes(&["src/app/mod.rs", "src/main.rs", "README.md"]);
        let tree = FileTree::build(&changes, "/repo", &[], None);
        let src = tree.find("src").unwrap();
        assert!(tree.node(src).is_folder());
        assert!(tree.find("src/app/mod.rs").is_some());
        assert_eq!(tree.node(tree.find("src/app").unwrap()).path, "src/app");
    }

    #[test]
    fn folders_sort_before_files() {
        let changes = make_changes(&["b.rs", "a/x.rs", "A.md", "c/y.rs"]);
        let tree = FileTree::build(&changes, "/repo", &[], None);
        let names: Vec<&str> = tree
            .children(ROOT)
            .iter()
            .map(|&id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c", "A.md", "b.rs"]);
    }

    #[test]
    fn nested_repo_becomes_leaf() {
        let changes = make_changes(&["vendor/lib/src/a.rs", "vendor/lib/src/b.rs", "main.rs"]);
        let nested = vec!["/repo/vendor/lib".to_string()];
        let tree = FileTree::build(&changes, "/repo", &nested, None);
        let lib = tree.find("vendor/lib").unwrap();
        assert!(matches!(tree.node(lib).kind, NodeKind::Repo { .. }));
        assert!(tree.children(lib).is_empty());
        assert_eq!(tree.children(tree.find("vendor").unwrap()).len(), 1);
    }

    #[test]
    fn without_review_everything_is_reviewed() {
        let changes = make_changes(&["a/x", "a/y"]);
        let tree = FileTree::build(&changes, "/repo", &[], None);
        assert!(reviewed(&tree, "a"));
        assert!(reviewed(&tree, "a/x"));
    }

    #[test]
    fn folder_reviewed_is_and_of_children() {
        let changes = make_changes(&["a/x", "a/y", "b/z"]);
        let review = make_review(&["a/y"]);
        let mut tree = FileTree::build(&changes, "/repo", &[], Some(&review));
        assert!(reviewed(&tree, "a/x"));
        assert!(!reviewed(&tree, "a/y"));
        assert!(!reviewed(&tree, "a"));
        assert!(!tree.node(ROOT).reviewed);

        let evaluated = tree.set_file_reviewed("a/y", true);
        assert!(reviewed(&tree, "a"));
        assert!(tree.node(ROOT).reviewed);
        // Only "a" and the root, never the sibling "b"
        assert_eq!(evaluated, 2);
    }

    #[test]
    fn ancestor_walk_stops_when_folder_unchanged() {
        let changes = make_changes(&["a/b/x", "a/b/y", "a/b/z"]);
        let review = make_review(&["a/b/x", "a/b/y"]);
        let mut tree = FileTree::build(&changes, "/repo", &[], Some(&review));
        // "a/b" stays unreviewed because "a/b/y" remains
        assert_eq!(tree.set_file_reviewed("a/b/x", true), 1);
        assert!(!reviewed(&tree, "a"));
    }

    #[test]
    fn set_file_reviewed_unknown_path_is_noop() {
        let changes = make_changes(&["a/x"]);
        let mut tree = FileTree::build(&changes, "/repo", &[], None);
        assert_eq!(tree.set_file_reviewed("missing/file", false), 0);
        assert_eq!(tree.set_file_reviewed("a", false), 0);
        assert!(reviewed(&tree, "a"));
    }

    #[test]
    fn set_all_reviewed_marks_every_node() {
        let changes = make_changes(&["a/x", "b/y"]);
        let review = make_review(&["a/x", "b/y"]);
        let mut tree = FileTree::build(&changes, "/repo", &[], Some(&review));
        tree.set_all_reviewed(true);
        assert!(reviewed(&tree, "a/x"));
        assert!(reviewed(&tree, "b"));
        assert!(tree.node(ROOT).reviewed);
    }

    #[test]
    fn file_paths_follow_display_order() {
        let changes = make_changes(&["z.rs", "src/b.rs", "src/a.rs"]);
        let tree = FileTree::build(&changes, "/repo", &[], None);
        assert_eq!(tree.file_paths(&changes), vec!["src/a.rs", "src/b.rs", "z.rs"]);
    }

    #[test]
    fn collapsed_folder_hides_children() {
        let changes = make_changes(&["src/a.rs", "top.rs"]);
        let mut tree = FileTree::build(&changes, "/repo", &[], None);
        assert_eq!(tree.visible_rows().len(), 3);
        let src = tree.find("src").unwrap();
        tree.toggle_folder(src);
        assert_eq!(tree.visible_rows(), vec![(0, src), (0, tree.find("top.rs").unwrap())]);
    }
}
