use crate::git::Commit;
use std::collections::HashMap;

/// Hash → row lookup over the loaded commit list. Rebuilt in full whenever
/// the list is replaced; never patched in place.
#[derive(Debug, Clone, Default)]
pub struct CommitIndex {
    rows: HashMap<String, usize>,
}

impl CommitIndex {
    /// Build the index. If a hash appears twice the first (newest) row wins.
    pub fn build(commits: &[Commit]) -> Self {
        let mut rows = HashMap::with_capacity(commits.len());
        for (row, commit) in commits.iter().enumerate() {
            rows.entry(commit.hash.clone()).or_insert(row);
        }
        Self { rows }
    }

    pub fn get(&self, hash: &str) -> Option<usize> {
        self.rows.get(hash).copied()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.rows.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Order two commits for a comparison: `(from, to)` where `from` is the
    /// older commit (the one further down the list). None if either is not loaded.
    pub fn order<'a>(&self, a: &'a str, b: &'a str) -> Option<(&'a str, &'a str)> {
        let row_a = self.get(a)?;
        let row_b = self.get(b)?;
        if row_a > row_b {
            Some((a, b))
        } else {
            Some((b, a))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::UNCOMMITTED;

    fn make_commit(hash: &str) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: Vec::new(),
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

    #[test]
    fn build_maps_every_hash_to_its_row() {
        let commits: Vec<Commit> = ["a", "b", "c"].iter().map(|h| make_commit(h)).collect();
        let index = CommitIndex::build(&commits);
        assert_eq!(index.len(), 3);
        for (row, commit) in commits.iter().enumerate() {
            assert_eq!(index.get(&commit.hash), Some(row));
        }
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn build_empty_list_is_empty() {
        let index = CommitIndex::build(&[]);
        assert!(index.is_empty());
        assert!(!index.contains("a"));
    }

    #[test]
    fn duplicate_hash_keeps_first_row() {
        let commits = vec![make_commit("a"), make_commit("a")];
        assert_eq!(CommitIndex::build(&commits).get("a"), Some(0));
    }

    #[test]
    fn order_puts_older_commit_first() {
        let commits: Vec<Commit> = [UNCOMMITTED, "new", "old"]
            .iter()
            .map(|h| make_commit(h))
            .collect();
        let index = CommitIndex::build(&commits);
        assert_eq!(index.order("new", "old"), Some(("old", "new")));
        assert_eq!(index.order("old", "new"), Some(("old", "new")));
        assert_eq!(index.order(UNCOMMITTED, "old"), Some(("old", UNCOMMITTED)));
    }

    #[test]
    fn order_missing_hash_is_none() {
        let index = CommitIndex::build(&[make_commit("a")]);
        assert_eq!(index.order("a", "zzz"), None);
    }
}
