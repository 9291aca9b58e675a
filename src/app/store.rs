use crate::app::filter::{repo_load_filter, BranchFilter};
use crate::app::index::CommitIndex;
use crate::app::panel::{ForcedClose, Panel};
use crate::app::persist::{load_json, save_json, StateStorage, VIEW_STATE_KEY};
use crate::app::repos::RepoState;
use crate::config::{LanesConfig, MuteConfig, OnRepoLoadConfig, RepoDefaults};
use crate::git::host::{CommitsQuery, RepoInfoQuery};
use crate::git::{same_shape_lists, Commit, CommitsPage, RepoConfig, RepoInfo, Stash};
use crate::graph::{self, GraphLayout, LayoutOptions, MuteOptions};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Everything needed to resume the view after the process is suspended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub current_repo: Option<String>,
    /// The current repo has not finished its first load
    pub current_repo_loading: bool,
    pub repos: BTreeMap<String, RepoState>,
    pub branches: Vec<String>,
    /// Checked-out branch name
    pub branch_head: Option<String>,
    pub config: Option<RepoConfig>,
    pub remotes: Vec<String>,
    pub stashes: Vec<Stash>,
    pub tags: Vec<String>,
    pub commits: Vec<Commit>,
    /// Hash of the checked-out commit
    pub commit_head: Option<String>,
    /// Email → image reference. Carried, never fetched.
    pub avatars: HashMap<String, String>,
    /// None until a repository load chooses one
    pub branch_filter: Option<BranchFilter>,
    pub more_commits_available: bool,
    pub max_commits: usize,
    pub only_follow_first_parent: bool,
    pub panel: Panel,
    pub scroll_top: usize,
    pub find_query: Option<String>,
}

/// Config-derived inputs the store needs
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub palette_size: usize,
    pub mute: MuteConfig,
    pub repo_defaults: RepoDefaults,
    pub on_repo_load: OnRepoLoadConfig,
    pub globs: Vec<String>,
}

impl StoreSettings {
    pub fn from_config(config: &LanesConfig) -> Self {
        Self {
            palette_size: config.graph.palette_size,
            mute: config.mute.clone(),
            repo_defaults: config.repo_defaults.clone(),
            on_repo_load: config.on_repo_load.clone(),
            globs: config.glob_patterns(),
        }
    }
}

/// What applying a commits page did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitsApplied {
    /// The list was replaced and laid out again
    pub relayout: bool,
    /// Only the uncommitted-changes row was swapped
    pub sentinel_replaced: bool,
    /// The open panel referenced a commit that is no longer loaded
    pub panel_closed: Option<ForcedClose>,
    /// This was the first load of the repository
    pub first_load: bool,
}

// ── Store ──

pub struct ViewStateStore {
    state: ViewState,
    index: CommitIndex,
    layout: GraphLayout,
    muted: Vec<bool>,
    /// Checked-out branch at the time of the last layout
    rendered_branch_head: Option<String>,
    /// Panel closed while replaying persisted state, not yet reported
    restore_closed: Option<ForcedClose>,
    settings: StoreSettings,
    storage: Box<dyn StateStorage>,
}

impl ViewStateStore {
    pub fn new(storage: Box<dyn StateStorage>, settings: StoreSettings) -> Self {
        Self {
            state: ViewState::default(),
            index: CommitIndex::default(),
            layout: GraphLayout::default(),
            muted: Vec::new(),
            rendered_branch_head: None,
            restore_closed: None,
            settings,
            storage,
        }
    }

    /// Resume from persisted state. A repository that had finished loading
    /// gets its index and layout rebuilt from the stored rows; one that was
    /// still loading starts over.
    pub fn restore(storage: Box<dyn StateStorage>, settings: StoreSettings) -> Self {
        let mut store = Self::new(storage, settings);
        let Some(prev) = load_json::<ViewState>(store.storage.as_ref(), VIEW_STATE_KEY) else {
            return store;
        };
        let repo_known = prev
            .current_repo
            .as_ref()
            .is_some_and(|r| prev.repos.contains_key(r));
        store.state = prev;
        if store.state.current_repo_loading || !repo_known {
            store.state.commits.clear();
            store.state.commit_head = None;
            store.state.panel = Panel::default();
            return store;
        }
        debug!(commits = store.state.commits.len(), "replaying restored view state");
        store.relayout();
        store.restore_closed = store.state.panel.invalidate(&store.index);
        if store.restore_closed.is_some() {
            store.save();
        }
        store
    }

    /// Take the panel closure that happened during [`Self::restore`], if any
    pub fn take_restore_closed(&mut self) -> Option<ForcedClose> {
        self.restore_closed.take()
    }

    // ── Read access ──

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn index(&self) -> &CommitIndex {
        &self.index
    }

    pub fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    pub fn is_muted(&self, row: usize) -> bool {
        self.muted.get(row).copied().unwrap_or(false)
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn current_repo(&self) -> Option<&str> {
        self.state.current_repo.as_deref()
    }

    pub fn repo_state(&self) -> Option<&RepoState> {
        self.state.current_repo.as_ref().and_then(|r| self.state.repos.get(r))
    }

    pub fn storage(&self) -> &dyn StateStorage {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn StateStorage {
        self.storage.as_mut()
    }

    pub fn commit(&self, hash: &str) -> Option<&Commit> {
        self.index.get(hash).and_then(|row| self.state.commits.get(row))
    }

    /// Registered repositories nested inside the current one
    pub fn nested_repos(&self) -> Vec<String> {
        let Some(current) = self.current_repo() else {
            return Vec::new();
        };
        let prefix = format!("{}/", current.trim_end_matches('/'));
        self.state
            .repos
            .keys()
            .filter(|r| r.starts_with(&prefix))
            .cloned()
            .collect()
    }

    // ── Queries ──

    pub fn repo_info_query(&self) -> RepoInfoQuery {
        let repo = self.repo_state().cloned().unwrap_or_default();
        let d = &self.settings.repo_defaults;
        RepoInfoQuery {
            show_remote_branches: repo.show_remote_branches(d),
            show_stashes: repo.show_stashes(d),
            hide_remotes: repo.hide_remotes,
        }
    }

    pub fn commits_query(&self) -> CommitsQuery {
        let repo = self.repo_state().cloned().unwrap_or_default();
        let d = &self.settings.repo_defaults;
        let branches = self
            .state
            .branch_filter
            .as_ref()
            .and_then(|f| f.query_branches(&self.state.branches, &self.settings.globs));
        CommitsQuery {
            branches,
            max_commits: self.state.max_commits,
            show_tags: repo.show_tags(d),
            show_remote_branches: repo.show_remote_branches(d),
            include_reflog_commits: repo.include_reflog_commits(d),
            only_follow_first_parent: repo.only_follow_first_parent(d),
            ordering: repo.commit_ordering(d),
            remotes: self.state.remotes.clone(),
            hide_remotes: repo.hide_remotes,
            stashes: self.state.stashes.clone(),
        }
    }

    // ── Mutations (each one persists) ──

    pub fn save(&mut self) {
        if let Err(e) = save_json(self.storage.as_mut(), VIEW_STATE_KEY, &self.state) {
            warn!("failed to persist view state: {e:#}");
        }
    }

    pub fn set_repos(&mut self, repos: BTreeMap<String, RepoState>) {
        self.state.repos = repos;
        self.save();
    }

    pub fn update_repo_state(&mut self, f: impl FnOnce(&mut RepoState)) {
        let Some(repo) = self.state.current_repo.clone() else {
            return;
        };
        f(self.state.repos.entry(repo).or_default());
        self.save();
    }

    /// Switch to a repository: forget everything loaded for the previous one
    pub fn load_repo(&mut self, repo: &str, initial_commits: usize) {
        self.state.current_repo = Some(repo.to_string());
        self.state.current_repo_loading = true;
        self.state.repos.entry(repo.to_string()).or_default();
        self.state.max_commits = initial_commits;
        self.state.config = None;
        self.state.remotes.clear();
        self.state.stashes.clear();
        self.state.tags.clear();
        self.state.branch_filter = None;
        self.state.panel.close();
        self.save();
    }

    /// Drop every row. Used when a hard refresh starts or a load fails.
    pub fn clear_commits(&mut self) {
        self.state.more_commits_available = false;
        self.state.commits.clear();
        self.state.commit_head = None;
        self.rendered_branch_head = None;
        self.state.panel.close();
        self.index = CommitIndex::default();
        self.layout = GraphLayout::default();
        self.muted.clear();
        self.save();
    }

    /// Apply a repo-info response. Returns whether anything the commits
    /// query depends on changed.
    pub fn apply_repo_info(&mut self, info: RepoInfo, hard: bool) -> bool {
        self.state.stashes = info.stashes;
        if !info.is_repo
            || (!hard
                && self.state.branches == info.branches
                && self.state.branch_head == info.head
                && self.state.remotes == info.remotes)
        {
            self.save();
            return false;
        }

        self.state.branches = info.branches;
        self.state.branch_head = info.head;
        self.state.remotes = info.remotes;

        let globs = &self.settings.globs;
        let kept = self
            .state
            .branch_filter
            .as_ref()
            .and_then(|f| f.retain_existing(&self.state.branches, globs));
        let filter = match kept {
            Some(filter) => filter,
            None => {
                let repo = self.repo_state().cloned().unwrap_or_default();
                let on_load = &self.settings.on_repo_load;
                repo_load_filter(
                    repo.on_load_show_specific_branches(on_load),
                    repo.on_load_show_checked_out_branch(on_load),
                    self.state.branch_head.as_deref(),
                    &self.state.branches,
                    globs,
                )
            }
        };
        self.state.branch_filter = Some(filter);

        if let Some(repo) = self.state.current_repo.clone() {
            if let Some(repo_state) = self.state.repos.get_mut(&repo) {
                let remotes = &self.state.remotes;
                let before = repo_state.hide_remotes.len();
                repo_state.hide_remotes.retain(|r| remotes.contains(r));
                if repo_state.hide_remotes.len() != before {
                    debug!(repo = %repo, "pruned hidden remotes that no longer exist");
                }
            }
        }

        self.save();
        true
    }

    /// Apply a commits response, skipping the layout when nothing structural changed
    pub fn apply_commits(&mut self, page: CommitsPage, hard: bool) -> CommitsApplied {
        let tags_changed = self.state.tags != page.tags;
        self.state.tags = page.tags;

        if !self.state.current_repo_loading
            && !hard
            && self.state.more_commits_available == page.more_available
            && self.state.only_follow_first_parent == page.only_follow_first_parent
            && self.state.commit_head == page.head
            && !page.commits.is_empty()
            && same_shape_lists(&self.state.commits, &page.commits)
            && self.rendered_branch_head == self.state.branch_head
        {
            let mut applied = CommitsApplied::default();
            if self.state.commits.first().is_some_and(|c| c.is_uncommitted()) {
                if let Some(sentinel) = page.commits.into_iter().next() {
                    self.state.commits[0] = sentinel;
                }
                applied.sentinel_replaced = true;
                self.save();
            } else if tags_changed {
                self.save();
            }
            return applied;
        }

        let first_load = self.state.current_repo_loading;
        self.state.current_repo_loading = false;
        self.state.more_commits_available = page.more_available;
        self.state.only_follow_first_parent = page.only_follow_first_parent;
        self.state.commits = page.commits;
        self.state.commit_head = page.head;
        self.relayout();
        let panel_closed = self.state.panel.invalidate(&self.index);
        self.save();

        CommitsApplied {
            relayout: true,
            sentinel_replaced: false,
            panel_closed,
            first_load,
        }
    }

    pub fn set_config(&mut self, config: Option<RepoConfig>) {
        self.state.config = config;
        self.save();
    }

    /// Choose branches to show; the list restarts from the first page
    pub fn set_branch_filter(&mut self, filter: BranchFilter, initial_commits: usize) {
        self.state.branch_filter = Some(filter);
        self.state.max_commits = initial_commits;
        self.save();
    }

    pub fn load_more(&mut self, count: usize) {
        self.state.max_commits += count;
        self.save();
    }

    pub fn set_scroll(&mut self, scroll_top: usize) {
        if self.state.scroll_top != scroll_top {
            self.state.scroll_top = scroll_top;
            self.save();
        }
    }

    pub fn set_find_query(&mut self, query: Option<String>) {
        self.state.find_query = query;
        self.save();
    }

    /// Mutate the panel with the current rows at hand, then persist
    pub fn with_panel<R>(&mut self, f: impl FnOnce(&mut Panel, &[Commit], &CommitIndex) -> R) -> R {
        let out = f(&mut self.state.panel, &self.state.commits, &self.index);
        self.save();
        out
    }

    fn relayout(&mut self) {
        self.index = CommitIndex::build(&self.state.commits);
        let opts = LayoutOptions {
            palette_size: self.settings.palette_size,
            only_follow_first_parent: self.state.only_follow_first_parent,
        };
        self.layout = graph::compute(&self.state.commits, &self.index, &opts);
        let mute = MuteOptions {
            merge_commits: self.settings.mute.merge_commits,
            not_ancestors_of_head: self.settings.mute.commits_not_ancestors_of_head,
            only_follow_first_parent: self.state.only_follow_first_parent,
        };
        self.muted = graph::muted_rows(
            &self.state.commits,
            &self.index,
            self.state.commit_head.as_deref(),
            &mute,
        );
        self.rendered_branch_head = self.state.branch_head.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::persist::MemoryStateStorage;
    use crate::git::UNCOMMITTED;

    fn make_commit(hash: &str, parents: &[&str]) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            date: 1_700_000_000,
            message: format!("commit {hash}"),
            heads: Vec::new(),
            tags: Vec::new(),
            remotes: Vec::new(),
            stash: None,
        }
    }

    fn make_page(commits: Vec<Commit>) -> CommitsPage {
        CommitsPage {
            head: commits.iter().find(|c| !c.is_uncommitted()).map(|c| c.hash.clone()),
            commits,
            tags: Vec::new(),
            more_available: false,
            only_follow_first_parent: false,
        }
    }

    fn make_info(branches: &[&str], head: Option<&str>) -> RepoInfo {
        RepoInfo {
            branches: branches.iter().map(|s| s.to_string()).collect(),
            head: head.map(str::to_string),
            remotes: vec!["origin".to_string()],
            stashes: Vec::new(),
            is_repo: true,
        }
    }

    fn make_store() -> ViewStateStore {
        let settings = StoreSettings {
            palette_size: 8,
            ..Default::default()
        };
        let mut store = ViewStateStore::new(Box::new(MemoryStateStorage::new()), settings);
        store.load_repo("/repo", 300);
        store
    }

    fn linear() -> Vec<Commit> {
        vec![
            make_commit("c2", &["c1"]),
            make_commit("c1", &["c0"]),
            make_commit("c0", &[]),
        ]
    }

    #[test]
    fn first_page_is_laid_out() {
        let mut store = make_store();
        let applied = store.apply_commits(make_page(linear()), false);
        assert!(applied.relayout);
        assert!(applied.first_load);
        assert!(!store.state().current_repo_loading);
        assert_eq!(store.index().get("c1"), Some(1));
        assert_eq!(store.layout().rows(), 3);
    }

    #[test]
    fn unchanged_page_skips_layout() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let applied = store.apply_commits(make_page(linear()), false);
        assert_eq!(applied, CommitsApplied::default());
    }

    #[test]
    fn hard_refresh_always_relayouts() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        assert!(store.apply_commits(make_page(linear()), true).relayout);
    }

    #[test]
    fn message_only_change_is_not_structural() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let mut reworded = linear();
        reworded[0].message = "reworded".into();
        assert!(!store.apply_commits(make_page(reworded), false).relayout);
    }

    #[test]
    fn new_head_label_relayouts() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let mut labelled = linear();
        labelled[0].heads.push("main".into());
        assert!(store.apply_commits(make_page(labelled), false).relayout);
    }

    #[test]
    fn sentinel_row_is_swapped_in_place() {
        let mut store = make_store();
        let mut with_changes = linear();
        with_changes.insert(0, make_commit(UNCOMMITTED, &["c2"]));
        store.apply_commits(make_page(with_changes.clone()), false);

        with_changes[0].message = "Uncommitted Changes (3)".into();
        let applied = store.apply_commits(make_page(with_changes), false);
        assert!(!applied.relayout);
        assert!(applied.sentinel_replaced);
        assert_eq!(store.state().commits[0].message, "Uncommitted Changes (3)");
    }

    #[test]
    fn panel_closes_when_commit_leaves_window() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let c0 = store.commit("c0").cloned().unwrap();
        store.with_panel(|panel, _, _| panel.open_commit("/repo", &c0));
        assert!(store.state().panel.is_open());

        let applied = store.apply_commits(make_page(linear()[..2].to_vec()), false);
        assert!(applied.relayout);
        assert_eq!(applied.panel_closed, Some(ForcedClose::Commit));
        assert!(!store.state().panel.is_open());
    }

    #[test]
    fn unchanged_repo_info_reports_no_change() {
        let mut store = make_store();
        assert!(store.apply_repo_info(make_info(&["main"], Some("main")), false));
        assert!(!store.apply_repo_info(make_info(&["main"], Some("main")), false));
        assert!(store.apply_repo_info(make_info(&["main"], Some("main")), true));
    }

    #[test]
    fn not_a_repo_only_takes_stashes() {
        let mut store = make_store();
        let mut info = make_info(&["main"], Some("main"));
        info.is_repo = false;
        assert!(!store.apply_repo_info(info, true));
        assert!(store.state().branches.is_empty());
    }

    #[test]
    fn repo_load_defaults_to_all_branches() {
        let mut store = make_store();
        store.apply_repo_info(make_info(&["main", "dev"], Some("main")), false);
        assert_eq!(store.state().branch_filter, Some(BranchFilter::All));
        assert_eq!(store.commits_query().branches, None);
    }

    #[test]
    fn repo_load_shows_checked_out_branch_when_configured() {
        let mut store = make_store();
        store.settings.on_repo_load.show_checked_out_branch = true;
        store.apply_repo_info(make_info(&["main", "dev"], Some("dev")), false);
        assert_eq!(store.commits_query().branches, Some(vec!["dev".to_string()]));
    }

    #[test]
    fn deleted_branch_falls_out_of_filter() {
        let mut store = make_store();
        store.apply_repo_info(make_info(&["main", "dev"], Some("main")), false);
        store.set_branch_filter(BranchFilter::Branches(vec!["dev".into(), "main".into()]), 300);
        store.apply_repo_info(make_info(&["main"], Some("main")), false);
        assert_eq!(
            store.state().branch_filter,
            Some(BranchFilter::Branches(vec!["main".into()]))
        );
    }

    #[test]
    fn hidden_remotes_are_pruned() {
        let mut store = make_store();
        store.update_repo_state(|r| r.hide_remotes = vec!["origin".into(), "gone".into()]);
        store.apply_repo_info(make_info(&["main"], Some("main")), false);
        assert_eq!(store.repo_state().unwrap().hide_remotes, vec!["origin".to_string()]);
    }

    #[test]
    fn every_mutation_is_persisted() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let saved: ViewState = load_json(store.storage(), VIEW_STATE_KEY).unwrap();
        assert_eq!(saved.commits.len(), 3);

        store.set_scroll(7);
        let saved: ViewState = load_json(store.storage(), VIEW_STATE_KEY).unwrap();
        assert_eq!(saved.scroll_top, 7);
    }

    #[test]
    fn restore_rebuilds_index_and_keeps_panel() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let c1 = store.commit("c1").cloned().unwrap();
        store.with_panel(|panel, _, _| panel.open_commit("/repo", &c1));
        let json = store.storage().get(VIEW_STATE_KEY).unwrap().unwrap();

        let mut storage = MemoryStateStorage::new();
        storage.set(VIEW_STATE_KEY, &json).unwrap();
        let restored = ViewStateStore::restore(Box::new(storage), StoreSettings::default());
        assert_eq!(restored.index().get("c0"), Some(2));
        assert_eq!(restored.layout().rows(), 3);
        assert!(restored.state().panel.references("c1"));
    }

    #[test]
    fn restore_reports_panel_outside_window() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        let c0 = store.commit("c0").cloned().unwrap();
        store.with_panel(|panel, _, _| panel.open_commit("/repo", &c0));
        let mut saved = store.state().clone();
        saved.commits.truncate(2);

        let mut storage = MemoryStateStorage::new();
        storage.set(VIEW_STATE_KEY, &serde_json::to_string(&saved).unwrap()).unwrap();
        let mut restored = ViewStateStore::restore(Box::new(storage), StoreSettings::default());
        assert!(!restored.state().panel.is_open());
        assert_eq!(restored.take_restore_closed(), Some(ForcedClose::Commit));
        assert_eq!(restored.take_restore_closed(), None);
    }

    #[test]
    fn restore_while_loading_starts_over() {
        let mut storage = MemoryStateStorage::new();
        let state = ViewState {
            current_repo: Some("/repo".into()),
            current_repo_loading: true,
            repos: BTreeMap::from([("/repo".to_string(), RepoState::default())]),
            commits: linear(),
            ..Default::default()
        };
        storage.set(VIEW_STATE_KEY, &serde_json::to_string(&state).unwrap()).unwrap();
        let restored = ViewStateStore::restore(Box::new(storage), StoreSettings::default());
        assert!(restored.state().commits.is_empty());
        assert!(restored.index().is_empty());
    }

    #[test]
    fn clear_commits_resets_rows() {
        let mut store = make_store();
        store.apply_commits(make_page(linear()), false);
        store.clear_commits();
        assert!(store.state().commits.is_empty());
        assert!(store.index().is_empty());
        assert_eq!(store.layout().rows(), 0);
    }

    #[test]
    fn nested_repos_are_found_by_prefix() {
        let mut store = make_store();
        let mut repos = store.state().repos.clone();
        repos.insert("/repo/vendor/lib".into(), RepoState::default());
        repos.insert("/repository".into(), RepoState::default());
        store.set_repos(repos);
        assert_eq!(store.nested_repos(), vec!["/repo/vendor/lib".to_string()]);
    }
}
