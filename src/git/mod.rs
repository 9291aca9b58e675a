pub mod cli;
pub mod host;
mod model;
pub mod reviews;
pub mod worker;

pub use host::{Action, Host, LoadError, Request, Response};
pub use model::{
    abbrev_hash, have_files_changed, same_shape_lists, BranchConfig, Commit, CommitDetails,
    CommitOrdering, CommitRemote, CommitStash, CommitTag, CommitsPage, FileChange, FileStatus,
    RemoteConfig, RepoConfig, RepoInfo, Stash, UNCOMMITTED,
};
