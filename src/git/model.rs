use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved hash of the uncommitted-changes pseudo-commit (always row 0 when present)
pub const UNCOMMITTED: &str = "*";

// ── Commits ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitTag {
    pub name: String,
    pub annotated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRemote {
    /// Full remote ref name, e.g. `origin/main`
    pub name: String,
    /// Remote the ref belongs to, when known
    pub remote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStash {
    pub selector: String,
    pub base_hash: String,
    pub untracked_files_hash: Option<String>,
}

/// A commit row as loaded from the repository. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub email: String,
    /// Unix seconds
    pub date: i64,
    pub message: String,
    #[serde(default)]
    pub heads: Vec<String>,
    #[serde(default)]
    pub tags: Vec<CommitTag>,
    #[serde(default)]
    pub remotes: Vec<CommitRemote>,
    #[serde(default)]
    pub stash: Option<CommitStash>,
}

impl Commit {
    pub fn is_uncommitted(&self) -> bool {
        self.hash == UNCOMMITTED
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_stash(&self) -> bool {
        self.stash.is_some()
    }

    /// Structural equality used to decide whether a reloaded list needs a re-layout.
    /// Compares identity and labels, not message/author content.
    pub fn same_shape(&self, other: &Commit) -> bool {
        self.hash == other.hash
            && self.heads == other.heads
            && self.tags == other.tags
            && self.remotes == other.remotes
            && self.parents == other.parents
            && match (&self.stash, &other.stash) {
                (None, None) => true,
                (Some(a), Some(b)) => a.selector == b.selector,
                _ => false,
            }
    }

    /// Short form of the hash for display
    pub fn abbrev(&self) -> &str {
        abbrev_hash(&self.hash)
    }
}

pub fn abbrev_hash(hash: &str) -> &str {
    match hash.char_indices().nth(8) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

/// Compare two commit lists with [`Commit::same_shape`]
pub fn same_shape_lists(a: &[Commit], b: &[Commit]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
}

// ── Repository info ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub hash: String,
    pub base_hash: String,
    pub untracked_files_hash: Option<String>,
    pub selector: String,
    pub author: String,
    pub email: String,
    pub date: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub branches: Vec<String>,
    /// Checked-out branch name (None when detached)
    pub head: Option<String>,
    pub remotes: Vec<String>,
    pub stashes: Vec<Stash>,
    pub is_repo: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitsPage {
    pub commits: Vec<Commit>,
    /// Hash of the checked-out commit
    pub head: Option<String>,
    pub tags: Vec<String>,
    pub more_available: bool,
    pub only_follow_first_parent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitOrdering {
    #[default]
    Date,
    AuthorDate,
    Topological,
}

impl CommitOrdering {
    pub fn git_flag(&self) -> &'static str {
        match self {
            CommitOrdering::Date => "--date-order",
            CommitOrdering::AuthorDate => "--author-date-order",
            CommitOrdering::Topological => "--topo-order",
        }
    }
}

// ── Repository config ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    pub remote: Option<String>,
    pub push_remote: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub name: String,
    pub url: Option<String>,
    pub push_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub branches: HashMap<String, BranchConfig>,
    pub push_default: Option<String>,
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

impl RepoConfig {
    /// Pick the remote a branch should be pushed to: branch pushRemote, branch remote,
    /// remote.pushDefault, then `origin`, falling back to the first known remote.
    pub fn push_remote<'a>(&'a self, branch: Option<&str>, remotes: &'a [String]) -> Option<&'a str> {
        let mut candidates: Vec<Option<&str>> = Vec::new();
        if let Some(cfg) = branch.and_then(|b| self.branches.get(b)) {
            candidates.push(cfg.push_remote.as_deref());
            candidates.push(cfg.remote.as_deref());
        }
        candidates.push(self.push_default.as_deref());
        candidates.push(Some("origin"));
        candidates
            .into_iter()
            .flatten()
            .find(|c| remotes.iter().any(|r| r == c))
            .or_else(|| remotes.first().map(|r| r.as_str()))
    }
}

// ── File changes ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

impl FileStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            FileStatus::Added => "A",
            FileStatus::Modified => "M",
            FileStatus::Deleted => "D",
            FileStatus::Renamed => "R",
            FileStatus::Untracked => "U",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub old_path: String,
    pub new_path: String,
    pub status: FileStatus,
    pub additions: Option<usize>,
    pub deletions: Option<usize>,
}

/// Whether two file-change lists differ in a way that requires rebuilding the file tree
pub fn have_files_changed(old: Option<&[FileChange]>, new: Option<&[FileChange]>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub email: String,
    pub date: i64,
    pub committer: String,
    pub body: String,
    pub file_changes: Vec<FileChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(hash: &str, parents: &[&str]) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "A".to_string(),
            email: "a@example.com".to_string(),
            date: 0,
            message: "msg".to_string(),
            heads: Vec::new(),
            tags: Vec::new(),
            remotes: Vec::new(),
            stash: None,
        }
    }

    #[test]
    fn same_shape_ignores_message_and_author() {
        let a = commit("abc", &["def"]);
        let mut b = a.clone();
        b.message = "reworded".to_string();
        b.author = "B".to_string();
        assert!(a.same_shape(&b));
    }

    #[test]
    fn same_shape_detects_new_head_label() {
        let a = commit("abc", &["def"]);
        let mut b = a.clone();
        b.heads.push("main".to_string());
        assert!(!a.same_shape(&b));
    }

    #[test]
    fn same_shape_compares_stash_by_selector_only() {
        let mut a = commit("abc", &["def"]);
        a.stash = Some(CommitStash {
            selector: "refs/stash@{0}".to_string(),
            base_hash: "def".to_string(),
            untracked_files_hash: None,
        });
        let mut b = a.clone();
        if let Some(s) = b.stash.as_mut() {
            s.untracked_files_hash = Some("123".to_string());
        }
        assert!(a.same_shape(&b));

        if let Some(s) = b.stash.as_mut() {
            s.selector = "refs/stash@{1}".to_string();
        }
        assert!(!a.same_shape(&b));
    }

    #[test]
    fn same_shape_lists_requires_equal_length() {
        let a = vec![commit("a", &[]), commit("b", &[])];
        assert!(!same_shape_lists(&a, &a[..1]));
        assert!(same_shape_lists(&a, &a.clone()));
    }

    #[test]
    fn abbrev_hash_truncates_to_eight() {
        assert_eq!(abbrev_hash("0123456789abcdef"), "01234567");
        assert_eq!(abbrev_hash("*"), "*");
    }

    #[test]
    fn push_remote_prefers_branch_push_remote() {
        let mut cfg = RepoConfig::default();
        cfg.branches.insert(
            "main".to_string(),
            BranchConfig {
                remote: Some("origin".to_string()),
                push_remote: Some("fork".to_string()),
            },
        );
        let remotes = vec!["origin".to_string(), "fork".to_string()];
        assert_eq!(cfg.push_remote(Some("main"), &remotes), Some("fork"));
        assert_eq!(cfg.push_remote(Some("other"), &remotes), Some("origin"));
    }

    #[test]
    fn push_remote_falls_back_to_first_remote() {
        let cfg = RepoConfig::default();
        let remotes = vec!["upstream".to_string()];
        assert_eq!(cfg.push_remote(None, &remotes), Some("upstream"));
        assert_eq!(cfg.push_remote(None, &[]), None);
    }

    #[test]
    fn have_files_changed_handles_absent_lists() {
        let change = FileChange {
            old_path: "a".to_string(),
            new_path: "a".to_string(),
            status: FileStatus::Modified,
            additions: Some(1),
            deletions: Some(0),
        };
        let list = vec![change.clone()];
        assert!(!have_files_changed(None, None));
        assert!(have_files_changed(None, Some(&list)));
        assert!(!have_files_changed(Some(&list), Some(&list)));
        let mut other = change;
        other.additions = Some(2);
        assert!(have_files_changed(Some(&list), Some(&[other])));
    }
}
