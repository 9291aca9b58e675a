use crate::app::index::CommitIndex;
use crate::git::Commit;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuteOptions {
    pub merge_commits: bool,
    pub not_ancestors_of_head: bool,
    pub only_follow_first_parent: bool,
}

/// Rows drawn dimmed. The "current" commit is the uncommitted sentinel when it
/// occupies row 0, otherwise the checked-out commit.
pub fn muted_rows(
    commits: &[Commit],
    index: &CommitIndex,
    head: Option<&str>,
    opts: &MuteOptions,
) -> Vec<bool> {
    let mut muted = vec![false; commits.len()];

    if opts.merge_commits {
        for (row, commit) in commits.iter().enumerate() {
            if commit.is_merge() && !commit.is_stash() && !commit.is_uncommitted() {
                muted[row] = true;
            }
        }
    }

    if opts.not_ancestors_of_head {
        let current = match commits.first() {
            Some(c) if c.is_uncommitted() => Some(0),
            _ => head.and_then(|h| index.get(h)),
        };
        // A current commit outside the window mutes nothing
        if let Some(start) = current {
            let reachable = reachable_from(commits, index, start, opts.only_follow_first_parent);
            for (row, is_reachable) in reachable.into_iter().enumerate() {
                if !is_reachable {
                    muted[row] = true;
                }
            }
        }
    }

    muted
}

fn reachable_from(
    commits: &[Commit],
    index: &CommitIndex,
    start: usize,
    first_parent_only: bool,
) -> Vec<bool> {
    let mut seen = vec![false; commits.len()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;

    while let Some(row) = queue.pop_front() {
        let parents = &commits[row].parents;
        let take = if first_parent_only { 1 } else { parents.len() };
        for parent in parents.iter().take(take) {
            if let Some(parent_row) = index.get(parent) {
                if !seen[parent_row] {
                    seen[parent_row] = true;
                    queue.push_back(parent_row);
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::UNCOMMITTED;

    fn make_commit(hash: &str, parents: &[&str]) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: String::new(),
            email: String::new(),
            date: 0,
            message: String::new(),
            heads: Vec::new(),
            tags: Vec::new(),
            remotes: Vec::new(),
            stash: None,
        }
    }

    fn history() -> Vec<Commit> {
        vec![
            make_commit("side", &["base"]),
            make_commit("merge", &["main", "topic"]),
            make_commit("topic", &["base"]),
            make_commit("main", &["base"]),
            make_commit("base", &[]),
        ]
    }

    #[test]
    fn nothing_muted_by_default() {
        let commits = history();
        let index = CommitIndex::build(&commits);
        let muted = muted_rows(&commits, &index, Some("merge"), &MuteOptions::default());
        assert!(muted.iter().all(|m| !m));
    }

    #[test]
    fn merge_commits_are_muted() {
        let commits = history();
        let index = CommitIndex::build(&commits);
        let opts = MuteOptions {
            merge_commits: true,
            ..Default::default()
        };
        let muted = muted_rows(&commits, &index, None, &opts);
        assert_eq!(muted, vec![false, true, false, false, false]);
    }

    #[test]
    fn rows_not_reachable_from_head_are_muted() {
        let commits = history();
        let index = CommitIndex::build(&commits);
        let opts = MuteOptions {
            not_ancestors_of_head: true,
            ..Default::default()
        };
        let muted = muted_rows(&commits, &index, Some("merge"), &opts);
        assert_eq!(muted, vec![true, false, false, false, false]);
    }

    #[test]
    fn first_parent_mode_only_follows_first_parents() {
        let commits = history();
        let index = CommitIndex::build(&commits);
        let opts = MuteOptions {
            not_ancestors_of_head: true,
            only_follow_first_parent: true,
            ..Default::default()
        };
        let muted = muted_rows(&commits, &index, Some("merge"), &opts);
        assert_eq!(muted, vec![true, false, true, false, false]);
    }

    #[test]
    fn sentinel_in_row_zero_is_the_current_commit() {
        let mut commits = vec![make_commit(UNCOMMITTED, &["main"])];
        commits.extend(history());
        let index = CommitIndex::build(&commits);
        let opts = MuteOptions {
            not_ancestors_of_head: true,
            ..Default::default()
        };
        // head hash is ignored in favour of the sentinel
        let muted = muted_rows(&commits, &index, Some("side"), &opts);
        assert_eq!(muted, vec![false, true, true, true, false, false]);
    }

    #[test]
    fn head_outside_window_mutes_nothing() {
        let commits = history();
        let index = CommitIndex::build(&commits);
        let opts = MuteOptions {
            not_ancestors_of_head: true,
            ..Default::default()
        };
        let muted = muted_rows(&commits, &index, Some("unloaded"), &opts);
        assert!(muted.iter().all(|m| !m));
    }
}
