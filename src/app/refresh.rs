use tracing::debug;

// ── Request ids ──

/// Monotonic request counters, one per response category. A response is
/// current only if it echoes the latest id handed out for its category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIds {
    repo_info: u64,
    commits: u64,
}

impl RequestIds {
    pub fn next_repo_info(&mut self) -> u64 {
        self.repo_info += 1;
        self.repo_info
    }

    pub fn next_commits(&mut self) -> u64 {
        self.commits += 1;
        self.commits
    }

    pub fn is_current_repo_info(&self, id: u64) -> bool {
        id == self.repo_info
    }

    pub fn is_current_commits(&self, id: u64) -> bool {
        id == self.commits
    }

    /// Invalidate everything in flight
    pub fn supersede(&mut self) {
        self.repo_info += 1;
        self.commits += 1;
    }
}

// ── Cycles ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    /// Repo info, then commits
    RepoInfoThenCommits,
    /// Repo info; commits follow only if it changed or the cycle is hard
    RepoInfoOnly,
    CommitsOnly,
}

impl RefreshScope {
    fn needs_repo_info(self) -> bool {
        !matches!(self, RefreshScope::CommitsOnly)
    }

    /// Smallest scope covering both
    fn widen(self, other: RefreshScope) -> RefreshScope {
        if self == other {
            self
        } else {
            RefreshScope::RepoInfoThenCommits
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    RequestingRepoInfo,
    RequestingCommits,
    /// Repo info in flight with a commits request chained behind it
    RequestingBoth,
}

/// A request the coordinator wants sent. The caller fills in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    RepoInfo { id: u64 },
    Commits { id: u64 },
}

/// Summary of a finished cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub hard: bool,
    pub repo_info_changes: bool,
    pub config_changes: bool,
    pub loaded_commits: bool,
    /// Trigger queued while the cycle ran; start it now
    pub follow_up: Option<RefreshScope>,
}

/// What happens after a repo-info response was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterRepoInfo {
    RequestCommits { id: u64 },
    Finished(CycleOutcome),
}

#[derive(Debug, Clone, Default)]
pub struct RefreshCoordinator {
    ids: RequestIds,
    in_progress: bool,
    hard: bool,
    repo_info_changes: bool,
    config_changes: bool,
    requesting_repo_info: bool,
    requesting_commits: bool,
    requesting_config: bool,
    chain_commits: bool,
    follow_up: Option<RefreshScope>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RefreshPhase {
        if !self.in_progress {
            RefreshPhase::Idle
        } else if self.requesting_repo_info && self.chain_commits {
            RefreshPhase::RequestingBoth
        } else if self.requesting_repo_info {
            RefreshPhase::RequestingRepoInfo
        } else {
            RefreshPhase::RequestingCommits
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn is_hard(&self) -> bool {
        self.hard
    }

    pub fn has_follow_up(&self) -> bool {
        self.follow_up.is_some()
    }

    /// Ask for a refresh. Returns the request to send, or None when the
    /// trigger was folded into the cycle already running.
    pub fn trigger(&mut self, scope: RefreshScope, hard: bool, config_changes: bool) -> Option<Outbound> {
        if self.in_progress {
            self.hard |= hard;
            self.config_changes |= config_changes;
            if self.requesting_repo_info && !scope.needs_repo_info() {
                // Commits will be requested once repo info lands
                self.chain_commits = true;
                debug!(?scope, "refresh coalesced into running cycle");
            } else {
                self.follow_up = Some(match self.follow_up {
                    Some(queued) => queued.widen(scope),
                    None => scope,
                });
                debug!(?scope, "refresh queued behind running cycle");
            }
            return None;
        }

        self.in_progress = true;
        self.hard = hard;
        self.repo_info_changes = false;
        self.config_changes = config_changes;
        self.follow_up = None;
        match scope {
            RefreshScope::CommitsOnly => {
                self.chain_commits = false;
                self.requesting_repo_info = false;
                self.requesting_commits = true;
                Some(Outbound::Commits {
                    id: self.ids.next_commits(),
                })
            }
            RefreshScope::RepoInfoThenCommits | RefreshScope::RepoInfoOnly => {
                self.chain_commits = scope == RefreshScope::RepoInfoThenCommits;
                self.requesting_repo_info = true;
                self.requesting_commits = false;
                Some(Outbound::RepoInfo {
                    id: self.ids.next_repo_info(),
                })
            }
        }
    }

    pub fn accepts_repo_info(&self, id: u64) -> bool {
        self.in_progress && self.requesting_repo_info && self.ids.is_current_repo_info(id)
    }

    pub fn accepts_commits(&self, id: u64) -> bool {
        self.in_progress && self.requesting_commits && self.ids.is_current_commits(id)
    }

    /// Record an accepted repo-info response
    pub fn repo_info_loaded(&mut self, is_repo: bool, changed: bool) -> AfterRepoInfo {
        self.requesting_repo_info = false;
        self.repo_info_changes |= changed;

        if !is_repo {
            return AfterRepoInfo::Finished(self.finish(false));
        }
        if !self.chain_commits && !self.repo_info_changes && !self.hard {
            return AfterRepoInfo::Finished(self.finish(false));
        }
        self.requesting_commits = true;
        AfterRepoInfo::RequestCommits {
            id: self.ids.next_commits(),
        }
    }

    /// Record an accepted commits response; the cycle is complete
    pub fn commits_loaded(&mut self) -> CycleOutcome {
        self.requesting_commits = false;
        self.finish(true)
    }

    /// Abort the cycle after a load error. Queued work is dropped; the user
    /// retries explicitly.
    pub fn fail(&mut self) {
        self.in_progress = false;
        self.requesting_repo_info = false;
        self.requesting_commits = false;
        self.chain_commits = false;
        self.follow_up = None;
    }

    /// Switch repositories: everything in flight becomes stale
    pub fn supersede(&mut self) {
        self.ids.supersede();
        self.fail();
        self.requesting_config = false;
        self.hard = false;
        self.repo_info_changes = false;
        self.config_changes = false;
    }

    fn finish(&mut self, loaded_commits: bool) -> CycleOutcome {
        self.in_progress = false;
        self.chain_commits = false;
        CycleOutcome {
            hard: self.hard,
            repo_info_changes: self.repo_info_changes,
            config_changes: self.config_changes,
            loaded_commits,
            follow_up: self.follow_up.take(),
        }
    }

    // ── Config ──

    /// Config is loaded when none is known yet, or after a commits load in a
    /// cycle that changed config.
    pub fn should_request_config(&self, have_config: bool, outcome: Option<&CycleOutcome>) -> bool {
        !have_config || outcome.is_some_and(|o| o.loaded_commits && o.config_changes)
    }

    pub fn config_requested(&mut self) {
        self.requesting_config = true;
    }

    pub fn config_received(&mut self) {
        self.requesting_config = false;
    }

    pub fn is_config_loading(&self) -> bool {
        self.requesting_config
    }
}
