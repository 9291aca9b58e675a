use crate::config::{OnRepoLoadConfig, RepoDefaults, RepoOrder};
use crate::git::CommitOrdering;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Tri-state per-repository switch that falls back to the global setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOverride {
    #[default]
    Default,
    Enabled,
    Disabled,
}

impl BooleanOverride {
    pub fn resolve(self, default: bool) -> bool {
        match self {
            BooleanOverride::Default => default,
            BooleanOverride::Enabled => true,
            BooleanOverride::Disabled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileViewType {
    #[default]
    Tree,
    List,
}

/// Settings remembered for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoState {
    /// Display name overriding the directory name
    pub name: Option<String>,
    pub column_widths: Option<Vec<u16>>,
    pub hide_remotes: Vec<String>,
    pub show_remote_branches: BooleanOverride,
    pub show_tags: BooleanOverride,
    pub show_stashes: BooleanOverride,
    pub include_reflog_commits: BooleanOverride,
    pub only_follow_first_parent: BooleanOverride,
    pub on_repo_load_show_checked_out_branch: BooleanOverride,
    pub on_repo_load_show_specific_branches: Option<Vec<String>>,
    pub commit_ordering: Option<CommitOrdering>,
    pub file_view: FileViewType,
}

impl RepoState {
    pub fn show_remote_branches(&self, d: &RepoDefaults) -> bool {
        self.show_remote_branches.resolve(d.show_remote_branches)
    }

    pub fn show_tags(&self, d: &RepoDefaults) -> bool {
        self.show_tags.resolve(d.show_tags)
    }

    pub fn show_stashes(&self, d: &RepoDefaults) -> bool {
        self.show_stashes.resolve(d.show_stashes)
    }

    pub fn include_reflog_commits(&self, d: &RepoDefaults) -> bool {
        self.include_reflog_commits.resolve(d.include_reflog_commits)
    }

    pub fn only_follow_first_parent(&self, d: &RepoDefaults) -> bool {
        self.only_follow_first_parent.resolve(d.only_follow_first_parent)
    }

    pub fn commit_ordering(&self, d: &RepoDefaults) -> CommitOrdering {
        self.commit_ordering.unwrap_or(d.commit_ordering)
    }

    pub fn on_load_show_checked_out_branch(&self, d: &OnRepoLoadConfig) -> bool {
        self.on_repo_load_show_checked_out_branch
            .resolve(d.show_checked_out_branch)
    }

    pub fn on_load_show_specific_branches<'a>(&'a self, d: &'a OnRepoLoadConfig) -> &'a [String] {
        self.on_repo_load_show_specific_branches
            .as_deref()
            .unwrap_or(&d.show_specific_branches)
    }
}

/// Last path component, ignoring a trailing slash
pub fn repo_name(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) if idx + 1 < trimmed.len() => &trimmed[idx + 1..],
        _ => trimmed,
    }
}

pub fn sorted_repo_paths(repos: &BTreeMap<String, RepoState>, order: RepoOrder) -> Vec<String> {
    let mut paths: Vec<String> = repos.keys().cloned().collect();
    if order == RepoOrder::Name {
        let display = |p: &String| -> String {
            repos
                .get(p)
                .and_then(|s| s.name.clone())
                .unwrap_or_else(|| repo_name(p).to_string())
                .to_lowercase()
        };
        paths.sort_by(|a, b| display(a).cmp(&display(b)).then_with(|| a.cmp(b)));
    }
    paths
}

// ── Repository picker ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOption {
    pub name: String,
    pub path: String,
    /// Parent directories that tell apart repositories sharing a name
    pub hint: String,
}

/// Picker entries. Repositories sharing a directory name are told apart by
/// growing their distinct name one parent directory at a time.
pub fn dropdown_options(repos: &BTreeMap<String, RepoState>, order: RepoOrder) -> Vec<RepoOption> {
    let repo_paths = sorted_repo_paths(repos, order);
    let mut paths: Vec<String> = Vec::with_capacity(repo_paths.len());
    let mut names: Vec<String> = Vec::with_capacity(repo_paths.len());
    let mut distinct: Vec<String> = Vec::with_capacity(repo_paths.len());
    let mut first_sep: Vec<isize> = Vec::with_capacity(repo_paths.len());
    let mut indexes = Vec::new();

    for (i, repo_path) in repo_paths.iter().enumerate() {
        let sep = repo_path.find('/').map_or(-1, |s| s as isize);
        first_sep.push(sep);
        let custom = repos
            .get(repo_path)
            .and_then(|s| s.name.clone())
            .filter(|n| !n.is_empty());
        if let Some(name) = custom {
            paths.push(repo_path.clone());
            names.push(name.clone());
            distinct.push(name);
        } else if sep == -1 || sep == repo_path.len() as isize - 1 {
            paths.push(repo_path.clone());
            names.push(repo_path.clone());
            distinct.push(repo_path.clone());
        } else {
            let path = repo_path.strip_suffix('/').unwrap_or(repo_path).to_string();
            let name = path[path.rfind('/').map_or(0, |s| s + 1)..].to_string();
            paths.push(path);
            names.push(name.clone());
            distinct.push(name);
            indexes.push(i);
        }
    }
    resolve_ambiguous(&indexes, &paths, &first_sep, &mut distinct);

    repo_paths
        .iter()
        .enumerate()
        .map(|(i, repo_path)| RepoOption {
            name: names[i].clone(),
            path: repo_path.clone(),
            hint: hint_for(&names[i], &distinct[i], &paths[i]),
        })
        .collect()
}

fn resolve_ambiguous(indexes: &[usize], paths: &[String], first_sep: &[isize], distinct: &mut [String]) {
    let mut first_occurrence: HashMap<String, usize> = HashMap::new();
    let mut ambiguous: Vec<(String, Vec<usize>)> = Vec::new();
    for &i in indexes {
        let name = distinct[i].clone();
        match first_occurrence.get(&name) {
            Some(&first) => match ambiguous.iter_mut().find(|(n, _)| *n == name) {
                Some((_, group)) => group.push(i),
                None => ambiguous.push((name, vec![first, i])),
            },
            None => {
                first_occurrence.insert(name, i);
            }
        }
    }

    for (_, group) in ambiguous {
        let mut retest = Vec::new();
        for i in group {
            let from = paths[i].len() as isize - distinct[i].len() as isize - 2;
            let next_sep = last_slash_at_or_before(&paths[i], from);
            if first_sep[i] < next_sep {
                distinct[i] = paths[i][(next_sep + 1) as usize..].to_string();
                retest.push(i);
            } else {
                distinct[i] = paths[i].clone();
            }
        }
        if retest.len() > 1 {
            resolve_ambiguous(&retest, paths, first_sep, distinct);
        }
    }
}

/// Position of the last '/' at or before `from`, or -1. A negative `from`
/// only inspects the first character.
fn last_slash_at_or_before(s: &str, from: isize) -> isize {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return -1;
    }
    let end = from.clamp(0, bytes.len() as isize - 1) as usize;
    bytes[..=end]
        .iter()
        .rposition(|&b| b == b'/')
        .map_or(-1, |p| p as isize)
}

fn hint_for(name: &str, distinct: &str, path: &str) -> String {
    if name == distinct {
        return String::new();
    }
    let Some(cut) = distinct.len().checked_sub(name.len() + 1) else {
        return String::new();
    };
    let hint_path = &distinct[..cut];
    let mut comps: Vec<&str> = hint_path.split('/').collect();
    let keep = if comps.first().is_some_and(|c| !c.is_empty()) { 2 } else { 3 };
    if comps.len() > keep {
        comps.truncate(keep);
        comps.push("...");
    }
    let prefix = if distinct != path { ".../" } else { "" };
    format!("{prefix}{}", comps.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repos(paths: &[&str]) -> BTreeMap<String, RepoState> {
        paths
            .iter()
            .map(|p| (p.to_string(), RepoState::default()))
            .collect()
    }

    fn option<'a>(options: &'a [RepoOption], path: &str) -> &'a RepoOption {
        options.iter().find(|o| o.path == path).unwrap()
    }

    #[test]
    fn boolean_override_falls_back_to_default() {
        assert!(BooleanOverride::Default.resolve(true));
        assert!(!BooleanOverride::Default.resolve(false));
        assert!(BooleanOverride::Enabled.resolve(false));
        assert!(!BooleanOverride::Disabled.resolve(true));
    }

    #[test]
    fn repo_state_resolves_against_defaults() {
        let defaults = RepoDefaults::default();
        let mut state = RepoState::default();
        assert_eq!(state.show_tags(&defaults), defaults.show_tags);
        state.show_tags = BooleanOverride::Disabled;
        assert!(!state.show_tags(&defaults));
        state.commit_ordering = Some(CommitOrdering::Topological);
        assert_eq!(state.commit_ordering(&defaults), CommitOrdering::Topological);
    }

    #[test]
    fn specific_branches_override_global_list() {
        let on_load = OnRepoLoadConfig {
            show_specific_branches: vec!["main".to_string()],
            ..OnRepoLoadConfig::default()
        };
        let mut state = RepoState::default();
        assert_eq!(state.on_load_show_specific_branches(&on_load), ["main".to_string()]);
        state.on_repo_load_show_specific_branches = Some(Vec::new());
        assert!(state.on_load_show_specific_branches(&on_load).is_empty());
    }

    #[test]
    fn repo_name_is_last_component() {
        assert_eq!(repo_name("/home/dev/project"), "project");
        assert_eq!(repo_name("/home/dev/project/"), "project");
        assert_eq!(repo_name("project"), "project");
    }

    #[test]
    fn unique_names_have_no_hint() {
        let repos = make_repos(&["/home/dev/alpha", "/home/dev/beta"]);
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        assert_eq!(option(&options, "/home/dev/alpha").name, "alpha");
        assert!(options.iter().all(|o| o.hint.is_empty()));
    }

    #[test]
    fn shared_names_get_parent_directory_hints() {
        let repos = make_repos(&["/home/a/proj/app", "/home/b/proj/app", "/x/other"]);
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        assert_eq!(option(&options, "/home/a/proj/app").hint, ".../a/proj");
        assert_eq!(option(&options, "/home/b/proj/app").hint, ".../b/proj");
        assert_eq!(option(&options, "/x/other").hint, "");
    }

    #[test]
    fn fully_ambiguous_path_keeps_leading_directories() {
        let repos = make_repos(&["/a/b/c/d/app", "/a/b/c/e/app"]);
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        // "d" alone tells them apart
        assert_eq!(option(&options, "/a/b/c/d/app").hint, ".../d");

        // Nothing left to grow into: the whole path is the distinct name
        let repos = make_repos(&["/one/app", "/two/app"]);
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        assert_eq!(option(&options, "/one/app").hint, "/one");
    }

    #[test]
    fn root_level_duplicates_use_whole_path() {
        let repos = make_repos(&["/app", "/srv/app"]);
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        // "/app" cannot grow further so its distinct name becomes the full path
        assert_eq!(option(&options, "/app").hint, "");
        assert_eq!(option(&options, "/srv/app").hint, "/srv");
    }

    #[test]
    fn custom_names_are_used_verbatim() {
        let mut repos = make_repos(&["/work/service"]);
        if let Some(state) = repos.get_mut("/work/service") {
            state.name = Some("Backend".to_string());
        }
        let options = dropdown_options(&repos, RepoOrder::FullPath);
        assert_eq!(options[0].name, "Backend");
        assert_eq!(options[0].hint, "");
    }

    #[test]
    fn name_order_sorts_by_display_name() {
        let repos = make_repos(&["/a/zeta", "/b/alpha"]);
        assert_eq!(sorted_repo_paths(&repos, RepoOrder::Name), vec!["/b/alpha", "/a/zeta"]);
        assert_eq!(sorted_repo_paths(&repos, RepoOrder::FullPath), vec!["/a/zeta", "/b/alpha"]);
    }
}
