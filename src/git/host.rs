use super::model::{
    CommitDetails, CommitOrdering, CommitStash, CommitsPage, FileChange, RepoConfig, RepoInfo,
    Stash,
};
use crate::app::review::CodeReview;
use thiserror::Error;

/// Failure reported by the repository collaborator for a load request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unable to run git: {0}")]
    Spawn(String),
    #[error("{0}")]
    Git(String),
}

// ── Requests ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfoQuery {
    pub show_remote_branches: bool,
    pub show_stashes: bool,
    pub hide_remotes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitsQuery {
    /// None shows every branch
    pub branches: Option<Vec<String>>,
    pub max_commits: usize,
    pub show_tags: bool,
    pub show_remote_branches: bool,
    pub include_reflog_commits: bool,
    pub only_follow_first_parent: bool,
    pub ordering: CommitOrdering,
    pub remotes: Vec<String>,
    pub hide_remotes: Vec<String>,
    pub stashes: Vec<Stash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Soft,
    Mixed,
    Hard,
}

impl ResetMode {
    pub fn flag(&self) -> &'static str {
        match self {
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
            ResetMode::Hard => "--hard",
        }
    }
}

/// Repository-mutating operations. Each reports one error slot per git
/// sub-operation it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CheckoutBranch { name: String, remote_branch: Option<String> },
    CheckoutCommit { hash: String },
    CreateBranch { name: String, hash: String, checkout: bool, force: bool },
    DeleteBranch { name: String, force: bool, delete_on_remotes: Vec<String> },
    RenameBranch { old_name: String, new_name: String },
    DeleteRemoteBranch { name: String, remote: String },
    Merge { obj: String, no_fast_forward: bool, squash: bool, no_commit: bool },
    Rebase { obj: String, ignore_date: bool },
    CherryPick { hash: String, parent_index: usize, record_origin: bool, no_commit: bool },
    Revert { hash: String, parent_index: usize },
    Reset { hash: String, mode: ResetMode },
    DropCommit { hash: String },
    AddTag { name: String, hash: String, message: Option<String>, force: bool, push_to_remote: Option<String> },
    DeleteTag { name: String, delete_on_remote: Option<String> },
    PushTag { name: String, remotes: Vec<String> },
    PushBranch { name: String, remotes: Vec<String>, set_upstream: bool, force: bool },
    PullBranch { name: String, remote: String, no_fast_forward: bool, squash: bool },
    Fetch { remote: Option<String>, prune: bool, prune_tags: bool },
    FetchIntoLocalBranch { remote: String, remote_branch: String, local_branch: String, force: bool },
    PushStash { message: String, include_untracked: bool },
    ApplyStash { selector: String, reinstate_index: bool },
    PopStash { selector: String, reinstate_index: bool },
    DropStash { selector: String },
    BranchFromStash { name: String, selector: String },
    AddRemote { name: String, url: String, push_url: Option<String>, fetch: bool },
    DeleteRemote { name: String },
    EditRemote { old_name: String, new_name: String, old_url: Option<String>, new_url: Option<String> },
    PruneRemote { name: String },
    CleanUntrackedFiles { directories: bool },
}

impl Action {
    /// Message shown above the error when the action fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            Action::CheckoutBranch { .. } => "Unable to Checkout Branch",
            Action::CheckoutCommit { .. } => "Unable to Checkout Commit",
            Action::CreateBranch { .. } => "Unable to Create Branch",
            Action::DeleteBranch { .. } => "Unable to Delete Branch",
            Action::RenameBranch { .. } => "Unable to Rename Branch",
            Action::DeleteRemoteBranch { .. } => "Unable to Delete Remote Branch",
            Action::Merge { .. } => "Unable to Merge",
            Action::Rebase { .. } => "Unable to Rebase",
            Action::CherryPick { .. } => "Unable to Cherry Pick Commit",
            Action::Revert { .. } => "Unable to Revert Commit",
            Action::Reset { .. } => "Unable to Reset to Commit",
            Action::DropCommit { .. } => "Unable to Drop Commit",
            Action::AddTag { .. } => "Unable to Add Tag",
            Action::DeleteTag { .. } => "Unable to Delete Tag",
            Action::PushTag { .. } => "Unable to Push Tag",
            Action::PushBranch { .. } => "Unable to Push Branch",
            Action::PullBranch { .. } => "Unable to Pull Branch",
            Action::Fetch { .. } => "Unable to Fetch from Remote(s)",
            Action::FetchIntoLocalBranch { .. } => "Unable to Fetch into Local Branch",
            Action::PushStash { .. } => "Unable to Stash Uncommitted Changes",
            Action::ApplyStash { .. } => "Unable to Apply Stash",
            Action::PopStash { .. } => "Unable to Pop Stash",
            Action::DropStash { .. } => "Unable to Drop Stash",
            Action::BranchFromStash { .. } => "Unable to Create Branch from Stash",
            Action::AddRemote { .. } => "Unable to Add Remote",
            Action::DeleteRemote { .. } => "Unable to Delete Remote",
            Action::EditRemote { .. } => "Unable to Save Changes to Remote",
            Action::PruneRemote { .. } => "Unable to Prune Remote",
            Action::CleanUntrackedFiles { .. } => "Unable to Clean Untracked Files",
        }
    }

    /// Whether a successful run alters the repository configuration
    pub fn changes_config(&self) -> bool {
        matches!(
            self,
            Action::AddRemote { .. }
                | Action::DeleteRemote { .. }
                | Action::EditRemote { .. }
                | Action::PushBranch { set_upstream: true, .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    LoadRepoInfo {
        repo: String,
        id: u64,
        query: RepoInfoQuery,
    },
    LoadCommits {
        repo: String,
        id: u64,
        query: CommitsQuery,
    },
    LoadConfig {
        repo: String,
        remotes: Vec<String>,
    },
    CommitDetails {
        repo: String,
        hash: String,
        stash: Option<CommitStash>,
        refresh: bool,
    },
    CompareCommits {
        repo: String,
        commit_hash: String,
        compare_with_hash: String,
        from: String,
        to: String,
        refresh: bool,
    },
    StartCodeReview {
        repo: String,
        id: String,
        files: Vec<String>,
        last_viewed_file: Option<String>,
        commit_hash: String,
        compare_with_hash: Option<String>,
    },
    UpdateCodeReview {
        repo: String,
        id: String,
        remaining_files: Vec<String>,
        last_viewed_file: Option<String>,
    },
    EndCodeReview {
        repo: String,
        id: String,
    },
    RunAction {
        repo: String,
        action: Action,
    },
}

// ── Responses ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    RepoInfo {
        repo: String,
        id: u64,
        result: Result<RepoInfo, LoadError>,
    },
    Commits {
        repo: String,
        id: u64,
        result: Result<CommitsPage, LoadError>,
    },
    Config {
        repo: String,
        result: Result<RepoConfig, LoadError>,
    },
    CommitDetails {
        repo: String,
        refresh: bool,
        result: Result<CommitDetails, LoadError>,
        code_review: Option<CodeReview>,
    },
    CompareCommits {
        repo: String,
        commit_hash: String,
        compare_with_hash: String,
        refresh: bool,
        result: Result<Vec<FileChange>, LoadError>,
        code_review: Option<CodeReview>,
    },
    CodeReviewStarted {
        repo: String,
        commit_hash: String,
        compare_with_hash: Option<String>,
        result: Result<CodeReview, LoadError>,
    },
    CodeReviewUpdated {
        repo: String,
        error: Option<String>,
    },
    ActionFinished {
        repo: String,
        action: Action,
        errors: Vec<Option<String>>,
    },
}

/// The request side of the repository collaborator. Responses come back
/// asynchronously, in any order, through whatever channel the implementation owns.
pub trait Host {
    fn send(&mut self, request: Request);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_edits_change_config() {
        let add = Action::AddRemote {
            name: "fork".into(),
            url: "git@example.com:fork.git".into(),
            push_url: None,
            fetch: false,
        };
        assert!(add.changes_config());
        let checkout = Action::CheckoutCommit { hash: "abc".into() };
        assert!(!checkout.changes_config());
    }

    #[test]
    fn push_with_upstream_changes_config() {
        let push = |set_upstream| Action::PushBranch {
            name: "main".into(),
            remotes: vec!["origin".into()],
            set_upstream,
            force: false,
        };
        assert!(push(true).changes_config());
        assert!(!push(false).changes_config());
    }

    #[test]
    fn load_error_displays_git_message_verbatim() {
        let err = LoadError::Git("fatal: bad revision 'HEAD'".into());
        assert_eq!(err.to_string(), "fatal: bad revision 'HEAD'");
    }
}
