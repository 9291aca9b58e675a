use crate::app::errors::{commits_load_error, reduce_errors, ErrorNotice};
use crate::app::filter::BranchFilter;
use crate::app::panel::{ForcedClose, PanelMenu, PanelScroll, TreeContext};
use crate::app::persist::UserPreferences;
use crate::app::repos::{dropdown_options, RepoOption};
use crate::app::refresh::{AfterRepoInfo, CycleOutcome, Outbound, RefreshCoordinator, RefreshScope};
use crate::app::store::ViewStateStore;
use crate::config::LanesConfig;
use crate::git::{Action, Commit, Host, LoadError, Request, Response};
use tracing::{debug, info, warn};

// ── Enums ──

/// Whether we're navigating, typing a find query, or answering a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Find,
    Confirm(ConfirmAction),
    /// Choosing a registered repository; holds the highlighted entry
    PickRepo(usize),
}

/// Actions that require user confirmation (y/n, or a for always)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    RunAction(Action),
}

/// Which pane receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Graph,
    Panel,
}

// ── App ──

/// Wires UI events and host responses to the store, the refresh coordinator
/// and the panel controller. `H` is the repository collaborator.
pub struct App<H: Host> {
    pub store: ViewStateStore,
    pub config: LanesConfig,
    pub preferences: UserPreferences,
    refresh: RefreshCoordinator,
    host: H,

    /// Row under the cursor
    pub selected: usize,
    /// Commit marked as the other side of a comparison
    pub compare_mark: Option<String>,
    pub focus: Focus,
    /// Visible file-tree row under the cursor when the panel has focus
    pub panel_cursor: usize,
    pub input_mode: InputMode,
    pub find_input: String,
    /// Rows that fit in the commit list, set by the event loop on resize
    pub viewport_rows: usize,

    pub error: Option<ErrorNotice>,
    pub watching: bool,
    pub should_quit: bool,
    pub message: Option<String>,
    message_ticks: u32,
}

impl<H: Host> App<H> {
    pub fn new(host: H, mut store: ViewStateStore, config: LanesConfig, preferences: UserPreferences) -> Self {
        let scroll_top = store.state().scroll_top;
        let restore_closed = store.take_restore_closed();
        let mut app = Self {
            store,
            config,
            preferences,
            refresh: RefreshCoordinator::new(),
            host,
            selected: scroll_top,
            compare_mark: None,
            focus: Focus::Graph,
            panel_cursor: 0,
            input_mode: InputMode::Normal,
            find_input: String::new(),
            viewport_rows: 20,
            error: None,
            watching: false,
            should_quit: false,
            message: None,
            message_ticks: 0,
        };
        if let Some(reason) = restore_closed {
            app.report_forced_close(reason);
        }
        app
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn refresh_state(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// First load after startup. A restored repository that had finished
    /// loading is refreshed softly; anything else loads from scratch.
    pub fn start(&mut self, repo: Option<String>) {
        let restored = self.store.current_repo().map(str::to_string);
        match (repo, restored) {
            (Some(repo), Some(current)) if repo == current && !self.store.state().current_repo_loading => {
                info!(repo = %repo, "resuming restored view");
                self.request_refresh(RefreshScope::RepoInfoThenCommits, false, false);
            }
            (Some(repo), _) => self.open_repo(&repo),
            (None, Some(current)) if !self.store.state().current_repo_loading => {
                info!(repo = %current, "resuming restored view");
                self.request_refresh(RefreshScope::RepoInfoThenCommits, false, false);
            }
            (None, Some(current)) => self.open_repo(&current),
            (None, None) => {}
        }
        self.clamp_selection();
    }

    // ── Repositories ──

    /// Register repositories named on the command line. Known ones keep their settings.
    pub fn register_repos(&mut self, paths: &[String]) {
        let mut repos = self.store.state().repos.clone();
        let before = repos.len();
        for path in paths {
            repos.entry(path.clone()).or_default();
        }
        if repos.len() != before {
            self.store.set_repos(repos);
        }
    }

    pub fn repo_options(&self) -> Vec<RepoOption> {
        dropdown_options(&self.store.state().repos, self.config.repos.order)
    }

    pub fn open_repo_picker(&mut self) {
        let options = self.repo_options();
        if options.is_empty() {
            return;
        }
        let current = self.store.current_repo();
        let selected = options
            .iter()
            .position(|o| Some(o.path.as_str()) == current)
            .unwrap_or(0);
        self.input_mode = InputMode::PickRepo(selected);
    }

    pub fn move_repo_picker(&mut self, delta: isize) {
        let InputMode::PickRepo(selected) = self.input_mode else {
            return;
        };
        let last = self.repo_options().len().saturating_sub(1);
        self.input_mode = InputMode::PickRepo(selected.saturating_add_signed(delta).min(last));
    }

    pub fn submit_repo_picker(&mut self) {
        let InputMode::PickRepo(selected) = std::mem::replace(&mut self.input_mode, InputMode::Normal) else {
            return;
        };
        let Some(option) = self.repo_options().into_iter().nth(selected) else {
            return;
        };
        if self.store.current_repo() != Some(option.path.as_str()) {
            self.open_repo(&option.path);
        }
    }

    // ── Refresh ──

    /// Switch repository: whatever is in flight for the previous one is stale
    pub fn open_repo(&mut self, repo: &str) {
        info!(repo, "loading repository");
        self.refresh.supersede();
        self.store.load_repo(repo, self.config.load.initial_commits);
        self.selected = 0;
        self.compare_mark = None;
        self.focus = Focus::Graph;
        self.error = None;
        self.request_refresh(RefreshScope::RepoInfoThenCommits, true, false);
    }

    /// Ask for a refresh. A hard refresh clears the rows immediately so the
    /// cycle that eventually completes rebuilds everything.
    pub fn request_refresh(&mut self, scope: RefreshScope, hard: bool, config_changes: bool) {
        if self.store.current_repo().is_none() {
            return;
        }
        if hard {
            self.store.clear_commits();
        }
        if let Some(outbound) = self.refresh.trigger(scope, hard, config_changes) {
            self.send_outbound(outbound);
        }
    }

    /// User-initiated retry after a load error
    pub fn retry(&mut self) {
        let Some(notice) = self.error.take() else {
            return;
        };
        if notice.retry_hard_refresh {
            self.request_refresh(RefreshScope::RepoInfoThenCommits, true, false);
        }
    }

    pub fn load_more(&mut self) {
        if !self.store.state().more_commits_available {
            return;
        }
        self.store.load_more(self.config.load.load_more_commits);
        self.request_refresh(RefreshScope::CommitsOnly, false, false);
    }

    pub fn set_branch_filter(&mut self, filter: BranchFilter) {
        self.store.set_branch_filter(filter, self.config.load.initial_commits);
        self.selected = 0;
        self.request_refresh(RefreshScope::CommitsOnly, true, false);
    }

    /// Flip between every branch and just the checked-out one
    pub fn toggle_branch_filter(&mut self) {
        let showing_all = self.store.state().branch_filter.as_ref().map_or(true, BranchFilter::is_all);
        let filter = match (showing_all, self.store.state().branch_head.clone()) {
            (true, Some(head)) => BranchFilter::Branches(vec![head]),
            _ => BranchFilter::All,
        };
        self.set_branch_filter(filter);
    }

    fn send_outbound(&mut self, outbound: Outbound) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let request = match outbound {
            Outbound::RepoInfo { id } => Request::LoadRepoInfo {
                repo,
                id,
                query: self.store.repo_info_query(),
            },
            Outbound::Commits { id } => Request::LoadCommits {
                repo,
                id,
                query: self.store.commits_query(),
            },
        };
        self.host.send(request);
    }

    fn request_config(&mut self) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        self.refresh.config_requested();
        self.host.send(Request::LoadConfig {
            repo,
            remotes: self.store.state().remotes.clone(),
        });
    }

    fn cycle_finished(&mut self, outcome: CycleOutcome) {
        debug!(?outcome, "refresh cycle finished");
        if !self.refresh.is_config_loading()
            && self
                .refresh
                .should_request_config(self.store.state().config.is_some(), Some(&outcome))
        {
            self.request_config();
        }
        if outcome.repo_info_changes {
            self.store.with_panel(|panel, _, _| panel.close_menu());
            if matches!(self.input_mode, InputMode::Confirm(_)) {
                self.input_mode = InputMode::Normal;
            }
        }
        self.clamp_selection();
        if let Some(scope) = outcome.follow_up {
            self.request_refresh(scope, false, false);
        }
    }

    fn load_failed(&mut self, title: &str, message: String) {
        warn!(title, %message, "refresh cycle failed");
        self.refresh.fail();
        self.store.clear_commits();
        self.selected = 0;
        self.error = Some(ErrorNotice::new(title, message).with_retry());
    }

    // ── Responses ──

    fn is_current(&self, repo: &str) -> bool {
        self.store.current_repo() == Some(repo)
    }

    /// Apply one response from the repository collaborator
    pub fn handle_response(&mut self, response: Response) {
        match response {
            Response::RepoInfo { repo, id, result } => {
                if !self.is_current(&repo) || !self.refresh.accepts_repo_info(id) {
                    debug!(repo = %repo, id, "discarding stale repo info");
                    return;
                }
                match result {
                    Ok(info) => {
                        let is_repo = info.is_repo;
                        let changed = self.store.apply_repo_info(info, self.refresh.is_hard());
                        match self.refresh.repo_info_loaded(is_repo, changed) {
                            AfterRepoInfo::RequestCommits { id } => self.send_outbound(Outbound::Commits { id }),
                            AfterRepoInfo::Finished(_) if !is_repo => {
                                warn!(repo = %repo, "no longer a git repository");
                                self.store.clear_commits();
                                self.error = Some(ErrorNotice::new(
                                    "Unable to load Repository",
                                    format!("{repo} is not a Git repository."),
                                ));
                            }
                            AfterRepoInfo::Finished(outcome) => self.cycle_finished(outcome),
                        }
                    }
                    Err(e) => self.load_failed("Unable to load Repository Info", e.to_string()),
                }
            }
            Response::Commits { repo, id, result } => {
                if !self.is_current(&repo) || !self.refresh.accepts_commits(id) {
                    debug!(repo = %repo, id, "discarding stale commits");
                    return;
                }
                match result {
                    Ok(page) => self.commits_loaded(&repo, page),
                    Err(e) => {
                        let message = commits_load_error(&e.to_string(), self.store.state().branches.len());
                        self.load_failed("Unable to load Commits", message);
                    }
                }
            }
            Response::Config { repo, result } => {
                if !self.is_current(&repo) {
                    return;
                }
                self.refresh.config_received();
                match result {
                    Ok(config) => self.store.set_config(Some(config)),
                    Err(e) => {
                        self.store.set_config(None);
                        self.error = Some(ErrorNotice::new("Unable to load Repository Configuration", e.to_string()));
                    }
                }
            }
            Response::CommitDetails {
                repo,
                refresh,
                result,
                code_review,
            } => {
                if !self.is_current(&repo) {
                    return;
                }
                match result {
                    Ok(details) => {
                        let nested = self.store.nested_repos();
                        self.store.with_panel(|panel, _, _| {
                            let tree = TreeContext {
                                repo_root: &repo,
                                nested_repos: &nested,
                            };
                            panel.show_details(details, code_review, refresh, tree)
                        });
                    }
                    Err(e) => self.panel_load_failed("Unable to load Commit Details", e, refresh),
                }
            }
            Response::CompareCommits {
                repo,
                commit_hash,
                compare_with_hash,
                refresh,
                result,
                code_review,
            } => {
                if !self.is_current(&repo) {
                    return;
                }
                match result {
                    Ok(files) => {
                        let nested = self.store.nested_repos();
                        self.store.with_panel(|panel, _, _| {
                            let tree = TreeContext {
                                repo_root: &repo,
                                nested_repos: &nested,
                            };
                            panel.show_comparison(&commit_hash, &compare_with_hash, files, code_review, refresh, tree)
                        });
                    }
                    Err(e) => self.panel_load_failed("Unable to load Commit Comparison", e, refresh),
                }
            }
            Response::CodeReviewStarted {
                repo,
                commit_hash,
                compare_with_hash,
                result,
            } => {
                if !self.is_current(&repo) {
                    return;
                }
                match result {
                    Ok(review) => {
                        self.store.with_panel(|panel, _, _| {
                            panel.review_started(&commit_hash, compare_with_hash.as_deref(), review)
                        });
                    }
                    Err(e) => self.error = Some(ErrorNotice::new("Unable to Start Code Review", e.to_string())),
                }
            }
            Response::CodeReviewUpdated { repo, error } => {
                if let (true, Some(error)) = (self.is_current(&repo), error) {
                    self.error = Some(ErrorNotice::new("Unable to Update Code Review", error));
                }
            }
            Response::ActionFinished { repo, action, errors } => {
                let reduced = reduce_errors(&errors);
                if self.is_current(&repo) && reduced.partial_or_complete_success {
                    self.request_refresh(RefreshScope::RepoInfoThenCommits, false, action.changes_config());
                }
                if let Some(error) = reduced.error {
                    self.error = Some(ErrorNotice::new(action.failure_message(), error));
                } else {
                    self.notify(&format!("{} done", action_label(&action)));
                }
            }
        }
    }

    fn commits_loaded(&mut self, repo: &str, page: crate::git::CommitsPage) {
        let applied = self.store.apply_commits(page, self.refresh.is_hard());
        if let Some(reason) = applied.panel_closed {
            self.report_forced_close(reason);
        }
        if applied.relayout || applied.sentinel_replaced {
            let request = self
                .store
                .with_panel(|panel, commits, index| panel.uncommitted_refresh(repo, commits, index));
            if let Some(request) = request {
                self.host.send(request);
            }
        }
        if applied.first_load && self.config.on_repo_load.scroll_to_head {
            let head_row = self
                .store
                .state()
                .commit_head
                .as_deref()
                .and_then(|head| self.store.index().get(head));
            if let Some(row) = head_row {
                self.select(row);
            }
        }
        if self
            .compare_mark
            .as_deref()
            .is_some_and(|mark| !self.store.index().contains(mark))
        {
            self.compare_mark = None;
        }
        let outcome = self.refresh.commits_loaded();
        self.cycle_finished(outcome);
    }

    fn panel_load_failed(&mut self, title: &str, error: LoadError, refresh: bool) {
        if refresh {
            warn!("{title}: {error}");
            return;
        }
        self.store.with_panel(|panel, _, _| panel.close());
        self.focus = Focus::Graph;
        self.error = Some(ErrorNotice::new(title, error.to_string()));
    }

    // ── Selection ──

    pub fn selected_commit(&self) -> Option<&Commit> {
        self.store.state().commits.get(self.selected)
    }

    pub fn select(&mut self, row: usize) {
        let rows = self.store.state().commits.len();
        if rows == 0 {
            self.selected = 0;
            return;
        }
        self.selected = row.min(rows - 1);
        self.keep_selection_visible();

        let near_end = self.selected + 1 >= rows;
        if near_end && self.config.load.auto_load_more && !self.refresh.in_progress() {
            self.load_more();
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let target = self.selected.saturating_add_signed(delta);
        self.select(target);
    }

    fn clamp_selection(&mut self) {
        let rows = self.store.state().commits.len();
        self.selected = self.selected.min(rows.saturating_sub(1));
        self.keep_selection_visible();
    }

    fn keep_selection_visible(&mut self) {
        let height = self.viewport_rows.max(1);
        let mut top = self.store.state().scroll_top;
        if self.selected < top {
            top = self.selected;
        } else if self.selected >= top + height {
            top = self.selected + 1 - height;
        }
        let max_top = self.store.state().commits.len().saturating_sub(height);
        self.store.set_scroll(top.min(max_top));
    }

    // ── Find ──

    pub fn start_find(&mut self) {
        self.find_input = self.store.state().find_query.clone().unwrap_or_default();
        self.input_mode = InputMode::Find;
    }

    pub fn submit_find(&mut self) {
        self.input_mode = InputMode::Normal;
        let query = self.find_input.trim().to_string();
        if query.is_empty() {
            self.store.set_find_query(None);
            return;
        }
        self.store.set_find_query(Some(query));
        self.find_next();
    }

    /// Move to the next row matching the find query, wrapping around
    pub fn find_next(&mut self) {
        let Some(query) = self.store.state().find_query.as_deref().map(str::to_lowercase) else {
            return;
        };
        let commits = &self.store.state().commits;
        let n = commits.len();
        let hit = (1..=n)
            .map(|offset| (self.selected + offset) % n)
            .find(|&row| commit_matches(&commits[row], &query));
        match hit {
            Some(row) => self.select(row),
            None => self.notify(&format!("No match for \"{query}\"")),
        }
    }

    // ── Panel ──

    /// Open the selected commit, or close the panel if it already shows it
    pub fn toggle_details(&mut self) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let Some(commit) = self.selected_commit().cloned() else {
            return;
        };
        let already_open = self
            .store
            .state()
            .panel
            .expanded()
            .is_some_and(|e| e.commit_hash == commit.hash && !e.is_comparison());
        if already_open {
            self.close_panel();
            return;
        }
        let request = self.store.with_panel(|panel, _, _| panel.open_commit(&repo, &commit));
        self.panel_cursor = 0;
        self.host.send(request);
    }

    /// Mark the selected commit; with a mark already set, compare the two
    pub fn mark_or_compare(&mut self) {
        let Some(hash) = self.selected_commit().map(|c| c.hash.clone()) else {
            return;
        };
        let Some(mark) = self.compare_mark.take() else {
            self.compare_mark = Some(hash);
            return;
        };
        if mark == hash {
            return;
        }
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let request = self
            .store
            .with_panel(|panel, _, index| panel.open_comparison(&repo, &hash, &mark, index));
        if let Some(request) = request {
            self.panel_cursor = 0;
            self.host.send(request);
        }
    }

    pub fn close_panel(&mut self) {
        if let Some(e) = self.store.state().panel.expanded() {
            if e.is_comparison() {
                let Some(repo) = self.store.current_repo().map(str::to_string) else {
                    return;
                };
                let request = self
                    .store
                    .with_panel(|panel, commits, index| panel.close_comparison(&repo, true, commits, index));
                if let Some(request) = request {
                    self.host.send(request);
                    return;
                }
            }
        }
        self.store.with_panel(|panel, _, _| panel.close());
        self.focus = Focus::Graph;
    }

    pub fn toggle_panel_menu(&mut self) {
        let menu = match self.focus {
            Focus::Graph => PanelMenu::Summary,
            Focus::Panel => PanelMenu::File(self.panel_cursor),
        };
        self.store.with_panel(|panel, _, _| {
            if panel.expanded().is_some_and(|e| e.menu.is_some()) {
                panel.close_menu();
            } else {
                panel.open_menu(menu);
            }
        });
    }

    pub fn scroll_panel_summary(&mut self, delta: isize) {
        let Some(scroll) = self.store.state().panel.expanded().map(|e| e.scroll) else {
            return;
        };
        self.store.with_panel(|panel, _, _| {
            panel.set_scroll(PanelScroll {
                summary: scroll.summary.saturating_add_signed(delta),
                ..scroll
            })
        });
    }

    /// `(depth, node)` rows of the open panel's file tree
    pub fn panel_rows(&self) -> Vec<(usize, usize)> {
        self.store
            .state()
            .panel
            .expanded()
            .and_then(|e| e.file_tree.as_ref())
            .map(|t| t.visible_rows())
            .unwrap_or_default()
    }

    pub fn move_panel_cursor(&mut self, delta: isize) {
        let rows = self.panel_rows().len();
        if rows == 0 {
            self.panel_cursor = 0;
            return;
        }
        self.panel_cursor = self.panel_cursor.saturating_add_signed(delta).min(rows - 1);
        let file_view = self.panel_cursor;
        self.store.with_panel(|panel, _, _| {
            let summary = panel.expanded().map_or(0, |e| e.scroll.summary);
            panel.set_scroll(PanelScroll { summary, file_view })
        });
    }

    /// Enter on a file-tree row: folders toggle, files count as viewed
    pub fn activate_panel_row(&mut self) {
        let Some((_, node_id)) = self.panel_rows().get(self.panel_cursor).copied() else {
            return;
        };
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let node = self
            .store
            .state()
            .panel
            .expanded()
            .and_then(|e| e.file_tree.as_ref())
            .map(|t| t.node(node_id).clone());
        let Some(node) = node else {
            return;
        };
        if node.is_folder() {
            self.store.with_panel(|panel, _, _| panel.toggle_folder(node_id));
            return;
        }
        let update = self.store.with_panel(|panel, _, _| panel.view_file(&repo, &node.path));
        self.send_review_update(update);
    }

    /// Flip the reviewed flag of the file under the panel cursor
    pub fn toggle_file_reviewed(&mut self) {
        let Some((_, node_id)) = self.panel_rows().get(self.panel_cursor).copied() else {
            return;
        };
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let node = self
            .store
            .state()
            .panel
            .expanded()
            .and_then(|e| e.file_tree.as_ref())
            .map(|t| t.node(node_id).clone());
        let Some(node) = node.filter(|n| !n.is_folder()) else {
            return;
        };
        let update = self
            .store
            .with_panel(|panel, _, _| panel.set_file_reviewed(&repo, &node.path, !node.reviewed));
        self.send_review_update(update);
    }

    fn send_review_update(&mut self, update: Option<crate::app::panel::ReviewUpdate>) {
        if let Some(update) = update {
            if update.ended {
                self.notify("Code review complete");
            }
            self.host.send(update.request);
        }
    }

    pub fn start_review(&mut self) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        let request = self.store.state().panel.start_review_request(&repo, self.store.index());
        match request {
            Some(request) => self.host.send(request),
            None => self.notify("Code review is not available here"),
        }
    }

    pub fn end_review(&mut self) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        if let Some(request) = self.store.with_panel(|panel, _, _| panel.end_review(&repo)) {
            self.host.send(request);
        }
    }

    // ── Actions ──

    /// Run an action, asking first where the user wants to be asked
    pub fn request_action(&mut self, action: Action) {
        let needs_confirm = match &action {
            Action::CheckoutCommit { .. } => !self.preferences.always_accept_checkout_commit,
            Action::Reset { .. } | Action::DropCommit { .. } | Action::DropStash { .. } => true,
            Action::CleanUntrackedFiles { .. } => true,
            _ => false,
        };
        if needs_confirm {
            self.input_mode = InputMode::Confirm(ConfirmAction::RunAction(action));
        } else {
            self.run_action(action);
        }
    }

    /// Answer the pending prompt. `always` also stops future prompts where
    /// that is a remembered preference.
    pub fn confirm(&mut self, accepted: bool, always: bool) {
        let InputMode::Confirm(pending) = std::mem::replace(&mut self.input_mode, InputMode::Normal) else {
            return;
        };
        if !accepted {
            return;
        }
        let ConfirmAction::RunAction(action) = pending;
        if always && matches!(action, Action::CheckoutCommit { .. }) {
            self.preferences.always_accept_checkout_commit = true;
            if let Err(e) = self.preferences.save(self.store.storage_mut()) {
                warn!("failed to save preferences: {e:#}");
            }
        }
        self.run_action(action);
    }

    fn run_action(&mut self, action: Action) {
        let Some(repo) = self.store.current_repo().map(str::to_string) else {
            return;
        };
        self.notify(&format!("{}…", action_label(&action)));
        self.host.send(Request::RunAction { repo, action });
    }

    /// Checkout for the selected row: its first local branch, else the commit
    pub fn checkout_selected(&mut self) {
        let Some(commit) = self.selected_commit() else {
            return;
        };
        if commit.is_uncommitted() || commit.is_stash() {
            return;
        }
        let action = match commit.heads.first() {
            Some(name) => Action::CheckoutBranch {
                name: name.clone(),
                remote_branch: None,
            },
            None => Action::CheckoutCommit {
                hash: commit.hash.clone(),
            },
        };
        self.request_action(action);
    }

    /// Drop the selected commit when no other loaded commit builds on it
    pub fn drop_selected(&mut self) {
        let Some(hash) = self.selected_commit().map(|c| c.hash.clone()) else {
            return;
        };
        if !self.store.layout().is_droppable(self.selected) {
            self.notify("Only commits on a single line of history without merges can be dropped");
            return;
        }
        self.request_action(Action::DropCommit { hash });
    }

    /// Stash rows pop, the uncommitted row stashes
    pub fn stash_selected(&mut self) {
        let Some(commit) = self.selected_commit() else {
            return;
        };
        let action = if let Some(stash) = &commit.stash {
            Action::PopStash {
                selector: stash.selector.clone(),
                reinstate_index: false,
            }
        } else if commit.is_uncommitted() {
            Action::PushStash {
                message: String::new(),
                include_untracked: true,
            }
        } else {
            return;
        };
        self.request_action(action);
    }

    // ── Notifications ──

    /// The panel was closed because its commits left the loaded window
    fn report_forced_close(&mut self, reason: ForcedClose) {
        self.focus = Focus::Graph;
        self.panel_cursor = 0;
        let message = reason.message(self.store.state().max_commits);
        warn!(?reason, "panel closed, commit no longer loaded");
        match reason {
            ForcedClose::CodeReview => {
                self.error = Some(ErrorNotice::new("Unable to resume Code Review", message));
            }
            ForcedClose::Commit | ForcedClose::Comparison => self.notify(&message),
        }
    }

    pub fn notify(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_ticks = 0;
    }

    /// Tick called on every event loop iteration; clears stale notifications
    pub fn tick(&mut self) {
        if self.message.is_some() {
            self.message_ticks += 1;
            if self.message_ticks > 30 {
                self.message = None;
                self.message_ticks = 0;
            }
        }
    }
}

fn commit_matches(commit: &Commit, query: &str) -> bool {
    commit.hash.starts_with(query)
        || commit.message.to_lowercase().contains(query)
        || commit.author.to_lowercase().contains(query)
        || commit.heads.iter().any(|h| h.to_lowercase().contains(query))
        || commit.tags.iter().any(|t| t.name.to_lowercase().contains(query))
}

fn action_label(action: &Action) -> &'static str {
    match action {
        Action::CheckoutBranch { .. } | Action::CheckoutCommit { .. } => "Checkout",
        Action::Fetch { .. } | Action::FetchIntoLocalBranch { .. } => "Fetch",
        Action::PushBranch { .. } | Action::PushTag { .. } => "Push",
        Action::PullBranch { .. } => "Pull",
        Action::PushStash { .. } => "Stash",
        Action::PopStash { .. } | Action::ApplyStash { .. } => "Apply stash",
        _ => "Action",
    }
}
