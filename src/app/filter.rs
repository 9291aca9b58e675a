use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

// ── Types ──

/// Which branches the commit list shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchFilter {
    #[default]
    All,
    /// Branch names and configured glob patterns, in selection order
    Branches(Vec<String>),
}

impl BranchFilter {
    pub fn is_all(&self) -> bool {
        matches!(self, BranchFilter::All)
    }

    pub fn selected(&self) -> &[String] {
        match self {
            BranchFilter::All => &[],
            BranchFilter::Branches(list) => list,
        }
    }

    /// Build from a user selection; an empty selection means every branch
    pub fn from_selection(selection: Vec<String>) -> Self {
        if selection.is_empty() {
            BranchFilter::All
        } else {
            BranchFilter::Branches(selection)
        }
    }

    /// Drop selected branches that no longer exist. Glob patterns survive.
    /// Returns None when nothing selected remains.
    pub fn retain_existing(&self, branches: &[String], globs: &[String]) -> Option<BranchFilter> {
        match self {
            BranchFilter::All => Some(BranchFilter::All),
            BranchFilter::Branches(list) => {
                let kept: Vec<String> = list
                    .iter()
                    .filter(|b| branches.contains(b) || globs.contains(b))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(BranchFilter::Branches(kept))
                }
            }
        }
    }

    /// Branch arguments for the commits query: None for all branches, globs
    /// expanded against the known branch names.
    pub fn query_branches(&self, branches: &[String], globs: &[String]) -> Option<Vec<String>> {
        let BranchFilter::Branches(list) = self else {
            return None;
        };
        let mut out: Vec<String> = Vec::new();
        for entry in list {
            if globs.contains(entry) {
                for name in expand_glob(entry, branches) {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            } else if !out.contains(entry) {
                out.push(entry.clone());
            }
        }
        Some(out)
    }
}

/// Filter to show when a repository loads with nothing selected: the
/// configured specific branches that exist, then the checked-out branch,
/// falling back to every branch.
pub fn repo_load_filter(
    specific: &[String],
    show_checked_out: bool,
    head: Option<&str>,
    branches: &[String],
    globs: &[String],
) -> BranchFilter {
    let mut selection: Vec<String> = specific
        .iter()
        .filter(|b| branches.contains(b) || globs.contains(b))
        .cloned()
        .collect();
    if show_checked_out {
        if let Some(head) = head {
            if !selection.iter().any(|b| b == head) {
                selection.push(head.to_string());
            }
        }
    }
    BranchFilter::from_selection(selection)
}

// ── Evaluator ──

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Branch names matching a glob. Remote branches (`remotes/<remote>/<name>`)
/// are matched on `<remote>/<name>` as well so `origin/*` works.
/// Invalid patterns match nothing.
pub fn expand_glob(pattern: &str, branches: &[String]) -> Vec<String> {
    let Ok(pattern) = Pattern::new(pattern) else {
        return Vec::new();
    };
    branches
        .iter()
        .filter(|b| {
            pattern.matches_with(b, MATCH_OPTIONS)
                || b.strip_prefix("remotes/")
                    .is_some_and(|short| pattern.matches_with(short, MATCH_OPTIONS))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_selection_is_all() {
        assert_eq!(BranchFilter::from_selection(Vec::new()), BranchFilter::All);
        assert!(BranchFilter::default().is_all());
    }

    #[test]
    fn all_queries_without_branch_arguments() {
        assert_eq!(BranchFilter::All.query_branches(&names(&["main"]), &[]), None);
    }

    #[test]
    fn glob_expands_against_known_branches() {
        let branches = names(&["main", "feature/a", "feature/b", "remotes/origin/feature/c"]);
        let globs = names(&["feature/*"]);
        let filter = BranchFilter::Branches(names(&["main", "feature/*"]));
        assert_eq!(
            filter.query_branches(&branches, &globs),
            Some(names(&["main", "feature/a", "feature/b"]))
        );
    }

    #[test]
    fn remote_glob_matches_short_name() {
        let branches = names(&["main", "remotes/origin/main", "remotes/upstream/main"]);
        assert_eq!(expand_glob("origin/*", &branches), names(&["remotes/origin/main"]));
    }

    #[test]
    fn expansion_removes_duplicates() {
        let branches = names(&["feature/a"]);
        let globs = names(&["feature/*"]);
        let filter = BranchFilter::Branches(names(&["feature/a", "feature/*"]));
        assert_eq!(filter.query_branches(&branches, &globs), Some(names(&["feature/a"])));
    }

    #[test]
    fn invalid_glob_matches_nothing() {
        assert!(expand_glob("[", &names(&["main"])).is_empty());
    }

    #[test]
    fn retain_existing_keeps_globs_and_drops_missing() {
        let filter = BranchFilter::Branches(names(&["gone", "main", "feature/*"]));
        let kept = filter.retain_existing(&names(&["main"]), &names(&["feature/*"]));
        assert_eq!(kept, Some(BranchFilter::Branches(names(&["main", "feature/*"]))));
    }

    #[test]
    fn retain_existing_reports_empty_selection() {
        let filter = BranchFilter::Branches(names(&["gone"]));
        assert_eq!(filter.retain_existing(&names(&["main"]), &[]), None);
    }

    #[test]
    fn repo_load_prefers_specific_branches_then_head() {
        let branches = names(&["main", "dev"]);
        let filter = repo_load_filter(&names(&["dev", "missing"]), true, Some("main"), &branches, &[]);
        assert_eq!(filter, BranchFilter::Branches(names(&["dev", "main"])));
    }

    #[test]
    fn repo_load_does_not_duplicate_head() {
        let branches = names(&["main"]);
        let filter = repo_load_filter(&names(&["main"]), true, Some("main"), &branches, &[]);
        assert_eq!(filter, BranchFilter::Branches(names(&["main"])));
    }

    #[test]
    fn repo_load_falls_back_to_all() {
        let filter = repo_load_filter(&[], false, Some("main"), &names(&["main"]), &[]);
        assert_eq!(filter, BranchFilter::All);
        let detached = repo_load_filter(&[], true, None, &names(&["main"]), &[]);
        assert_eq!(detached, BranchFilter::All);
    }
}
