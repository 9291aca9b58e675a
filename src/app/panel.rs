use crate::app::file_tree::FileTree;
use crate::app::index::CommitIndex;
use crate::app::review::{review_id, CodeReview};
use crate::git::host::Request;
use crate::git::{have_files_changed, Commit, CommitDetails, FileChange, UNCOMMITTED};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Context menu bound to the open panel. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMenu {
    Summary,
    /// Menu for the n-th visible file row
    File(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelScroll {
    pub summary: usize,
    pub file_view: usize,
}

/// The commit (or pair of commits) whose details are shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedCommit {
    pub commit_hash: String,
    pub compare_with_hash: Option<String>,
    pub details: Option<CommitDetails>,
    pub file_changes: Option<Vec<FileChange>>,
    pub file_tree: Option<FileTree>,
    pub code_review: Option<CodeReview>,
    pub last_viewed_file: Option<String>,
    pub loading: bool,
    #[serde(default)]
    pub scroll: PanelScroll,
    #[serde(skip)]
    pub menu: Option<PanelMenu>,
}

impl ExpandedCommit {
    fn loading(commit_hash: &str, compare_with_hash: Option<&str>) -> Self {
        Self {
            commit_hash: commit_hash.to_string(),
            compare_with_hash: compare_with_hash.map(str::to_string),
            details: None,
            file_changes: None,
            file_tree: None,
            code_review: None,
            last_viewed_file: None,
            loading: true,
            scroll: PanelScroll::default(),
            menu: None,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.compare_with_hash.is_some()
    }

    pub fn references(&self, hash: &str) -> bool {
        self.commit_hash == hash || self.compare_with_hash.as_deref() == Some(hash)
    }

    fn close_menu(&mut self) {
        if self.menu.take().is_some() {
            debug!(commit = %self.commit_hash, "closed panel context menu");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Single,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Loading(PanelKind),
    Loaded(PanelKind),
}

/// Where the file tree is rooted and which sub-paths are registered repos
#[derive(Debug, Clone, Copy)]
pub struct TreeContext<'a> {
    pub repo_root: &'a str,
    pub nested_repos: &'a [String],
}

/// What an open panel was showing when it was forced closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedClose {
    Commit,
    Comparison,
    CodeReview,
}

impl ForcedClose {
    /// Explanation shown to the user; `max_commits` is the loaded window size
    pub fn message(self, max_commits: usize) -> String {
        match self {
            ForcedClose::Commit => format!(
                "The commit shown in the panel is no longer within the latest {max_commits} commits loaded in this repository."
            ),
            ForcedClose::Comparison => format!(
                "The commits being compared are no longer within the latest {max_commits} commits loaded in this repository."
            ),
            ForcedClose::CodeReview => format!(
                "Unable to resume the Code Review, it could not be found in the latest {max_commits} commits loaded in this repository."
            ),
        }
    }
}

/// Result of marking a file in an active review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub request: Request,
    /// The last remaining file was reviewed and the review ended
    pub ended: bool,
}

// ── Controller ──

/// Detail/comparison panel. Owns at most one expanded commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Panel {
    expanded: Option<ExpandedCommit>,
}

impl Panel {
    pub fn state(&self) -> PanelState {
        match &self.expanded {
            None => PanelState::Closed,
            Some(e) => {
                let kind = if e.is_comparison() {
                    PanelKind::Comparison
                } else {
                    PanelKind::Single
                };
                if e.loading {
                    PanelState::Loading(kind)
                } else {
                    PanelState::Loaded(kind)
                }
            }
        }
    }

    pub fn expanded(&self) -> Option<&ExpandedCommit> {
        self.expanded.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.expanded.is_some()
    }

    pub fn references(&self, hash: &str) -> bool {
        self.expanded.as_ref().is_some_and(|e| e.references(hash))
    }

    /// Show one commit. Any previous panel is torn down first.
    pub fn open_commit(&mut self, repo: &str, commit: &Commit) -> Request {
        self.close();
        self.expanded = Some(ExpandedCommit::loading(&commit.hash, None));
        details_request(repo, commit, false)
    }

    /// Compare two loaded commits. Returns None when either is not in the index.
    pub fn open_comparison(
        &mut self,
        repo: &str,
        commit_hash: &str,
        compare_with_hash: &str,
        index: &CommitIndex,
    ) -> Option<Request> {
        let request = comparison_request(repo, commit_hash, compare_with_hash, index, false)?;
        if let Some(prev) = &mut self.expanded {
            if prev.commit_hash != commit_hash || prev.compare_with_hash.as_deref() != Some(compare_with_hash) {
                prev.close_menu();
            }
        }
        self.expanded = Some(ExpandedCommit::loading(commit_hash, Some(compare_with_hash)));
        Some(request)
    }

    /// Returns true if a panel was open
    pub fn close(&mut self) -> bool {
        match self.expanded.take() {
            Some(mut prev) => {
                prev.close_menu();
                true
            }
            None => false,
        }
    }

    /// Leave comparison mode. With `show_details`, fall back to the primary
    /// commit's details when it is still loaded; otherwise close.
    pub fn close_comparison(&mut self, repo: &str, show_details: bool, commits: &[Commit], index: &CommitIndex) -> Option<Request> {
        let expanded = self.expanded.as_mut()?;
        if !expanded.is_comparison() {
            return None;
        }
        expanded.close_menu();
        if !show_details {
            return None;
        }
        let primary = index.get(&expanded.commit_hash).and_then(|row| commits.get(row));
        match primary {
            Some(commit) => Some(self.open_commit(repo, commit)),
            None => {
                self.close();
                None
            }
        }
    }

    /// Apply a details response. Returns false when the panel no longer shows that commit.
    pub fn show_details(
        &mut self,
        details: CommitDetails,
        code_review: Option<CodeReview>,
        refresh: bool,
        tree: TreeContext<'_>,
    ) -> bool {
        let Some(expanded) = self.expanded.as_mut() else {
            return false;
        };
        if expanded.is_comparison() || expanded.commit_hash != details.hash {
            debug!(hash = %details.hash, "ignoring details for a panel that moved on");
            return false;
        }
        let files = details.file_changes.clone();
        apply_files(expanded, files, code_review, refresh, tree);
        expanded.details = Some(details);
        true
    }

    /// Apply a comparison response. Returns false when the panel no longer shows that pair.
    pub fn show_comparison(
        &mut self,
        commit_hash: &str,
        compare_with_hash: &str,
        files: Vec<FileChange>,
        code_review: Option<CodeReview>,
        refresh: bool,
        tree: TreeContext<'_>,
    ) -> bool {
        let Some(expanded) = self.expanded.as_mut() else {
            return false;
        };
        if expanded.commit_hash != commit_hash || expanded.compare_with_hash.as_deref() != Some(compare_with_hash) {
            debug!(commit_hash, compare_with_hash, "ignoring comparison for a panel that moved on");
            return false;
        }
        apply_files(expanded, files, code_review, refresh, tree);
        true
    }

    /// Close when a referenced commit left the loaded window, reporting what was open
    pub fn invalidate(&mut self, index: &CommitIndex) -> Option<ForcedClose> {
        let e = self.expanded.as_ref()?;
        let visible = index.contains(&e.commit_hash)
            && e.compare_with_hash.as_deref().map_or(true, |h| index.contains(h));
        if visible {
            return None;
        }
        let reason = if e.code_review.is_some() {
            ForcedClose::CodeReview
        } else if e.is_comparison() {
            ForcedClose::Comparison
        } else {
            ForcedClose::Commit
        };
        debug!(?reason, "panel commit left the loaded window");
        self.close();
        Some(reason)
    }

    /// Re-request whatever the panel shows when it involves uncommitted changes
    pub fn uncommitted_refresh(&self, repo: &str, commits: &[Commit], index: &CommitIndex) -> Option<Request> {
        let expanded = self.expanded.as_ref()?;
        match &expanded.compare_with_hash {
            None if expanded.commit_hash == UNCOMMITTED => {
                let commit = commits.first().filter(|c| c.is_uncommitted())?;
                Some(details_request(repo, commit, true))
            }
            Some(other) if expanded.commit_hash == UNCOMMITTED || other == UNCOMMITTED => {
                comparison_request(repo, &expanded.commit_hash, other, index, true)
            }
            _ => None,
        }
    }

    // ── Code review ──

    /// A review needs loaded files and cannot cover uncommitted changes
    pub fn can_review(&self, index: &CommitIndex) -> bool {
        let Some(e) = &self.expanded else {
            return false;
        };
        if e.loading || e.file_changes.is_none() {
            return false;
        }
        let to = match &e.compare_with_hash {
            Some(other) => index
                .order(&e.commit_hash, other)
                .map(|(_, to)| to)
                .unwrap_or(UNCOMMITTED),
            None => e.commit_hash.as_str(),
        };
        to != UNCOMMITTED
    }

    pub fn start_review_request(&self, repo: &str, index: &CommitIndex) -> Option<Request> {
        if !self.can_review(index) {
            return None;
        }
        let e = self.expanded.as_ref()?;
        if e.code_review.is_some() {
            return None;
        }
        let order = match &e.compare_with_hash {
            Some(other) => Some(index.order(&e.commit_hash, other)?),
            None => None,
        };
        let files = e
            .file_changes
            .as_ref()
            .map(|fc| fc.iter().map(|f| f.new_path.clone()).collect())
            .unwrap_or_default();
        Some(Request::StartCodeReview {
            repo: repo.to_string(),
            id: review_id(&e.commit_hash, order),
            files,
            last_viewed_file: e.last_viewed_file.clone(),
            commit_hash: e.commit_hash.clone(),
            compare_with_hash: e.compare_with_hash.clone(),
        })
    }

    /// Attach a review the host started. Ignored if the panel moved on.
    pub fn review_started(&mut self, commit_hash: &str, compare_with_hash: Option<&str>, review: CodeReview) -> bool {
        let Some(e) = self.expanded.as_mut() else {
            return false;
        };
        if e.commit_hash != commit_hash || e.compare_with_hash.as_deref() != compare_with_hash {
            return false;
        }
        let Some(tree) = e.file_tree.as_mut() else {
            return false;
        };
        tree.set_all_reviewed(false);
        for path in e.file_changes.iter().flatten().map(|f| f.new_path.as_str()) {
            if !review.is_remaining(path) {
                tree.set_file_reviewed(path, true);
            }
        }
        e.code_review = Some(review);
        true
    }

    /// Mark one file. The review ends by itself when nothing remains.
    pub fn set_file_reviewed(&mut self, repo: &str, path: &str, reviewed: bool) -> Option<ReviewUpdate> {
        let e = self.expanded.as_mut()?;
        let review = e.code_review.as_mut()?;
        if reviewed {
            review.mark_reviewed(path);
        } else {
            review.mark_unreviewed(path);
        }
        if let Some(tree) = e.file_tree.as_mut() {
            tree.set_file_reviewed(path, reviewed);
        }
        let request = Request::UpdateCodeReview {
            repo: repo.to_string(),
            id: review.id.clone(),
            remaining_files: review.remaining_files.clone(),
            last_viewed_file: e.last_viewed_file.clone(),
        };
        let ended = review.is_complete();
        if ended {
            debug!(id = %review.id, "code review complete");
            e.code_review = None;
        }
        Some(ReviewUpdate { request, ended })
    }

    /// Record a file as viewed; during a review, viewing marks it reviewed
    pub fn view_file(&mut self, repo: &str, path: &str) -> Option<ReviewUpdate> {
        let e = self.expanded.as_mut()?;
        e.last_viewed_file = Some(path.to_string());
        if e.code_review.is_none() {
            return None;
        }
        self.set_file_reviewed(repo, path, true)
    }

    /// End the active review. A second call is a no-op.
    pub fn end_review(&mut self, repo: &str) -> Option<Request> {
        let e = self.expanded.as_mut()?;
        let review = e.code_review.take()?;
        if let Some(tree) = e.file_tree.as_mut() {
            tree.set_all_reviewed(true);
        }
        Some(Request::EndCodeReview {
            repo: repo.to_string(),
            id: review.id,
        })
    }

    // ── View ──

    pub fn open_menu(&mut self, menu: PanelMenu) {
        if let Some(e) = self.expanded.as_mut() {
            e.menu = Some(menu);
        }
    }

    pub fn close_menu(&mut self) {
        if let Some(e) = self.expanded.as_mut() {
            e.close_menu();
        }
    }

    pub fn set_scroll(&mut self, scroll: PanelScroll) {
        if let Some(e) = self.expanded.as_mut() {
            e.scroll = scroll;
        }
    }

    pub fn toggle_folder(&mut self, node: usize) {
        if let Some(tree) = self.expanded.as_mut().and_then(|e| e.file_tree.as_mut()) {
            tree.toggle_folder(node);
        }
    }
}

fn apply_files(
    expanded: &mut ExpandedCommit,
    files: Vec<FileChange>,
    code_review: Option<CodeReview>,
    refresh: bool,
    tree: TreeContext<'_>,
) {
    if have_files_changed(expanded.file_changes.as_deref(), Some(&files)) {
        expanded.file_tree = Some(FileTree::build(&files, tree.repo_root, tree.nested_repos, code_review.as_ref()));
        expanded.file_changes = Some(files);
        expanded.close_menu();
    }
    if !refresh {
        expanded.last_viewed_file = code_review.as_ref().and_then(|r| r.last_viewed_file.clone());
    }
    expanded.code_review = code_review;
    expanded.loading = false;
}

fn details_request(repo: &str, commit: &Commit, refresh: bool) -> Request {
    Request::CommitDetails {
        repo: repo.to_string(),
        hash: commit.hash.clone(),
        stash: commit.stash.clone(),
        refresh,
    }
}

fn comparison_request(
    repo: &str,
    commit_hash: &str,
    compare_with_hash: &str,
    index: &CommitIndex,
    refresh: bool,
) -> Option<Request> {
    let (from, to) = index.order(commit_hash, compare_with_hash)?;
    Some(Request::CompareCommits {
        repo: repo.to_string(),
        commit_hash: commit_hash.to_string(),
        compare_with_hash: compare_with_hash.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        refresh,
    })
}
