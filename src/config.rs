use crate::git::CommitOrdering;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanesConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub mute: MuteConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub repo_defaults: RepoDefaults,
    #[serde(default)]
    pub on_repo_load: OnRepoLoadConfig,
    /// [[branch_globs]] entries offered next to real branches in the filter
    #[serde(default)]
    pub branch_globs: Vec<BranchGlob>,
    #[serde(default)]
    pub repos: ReposConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStyle {
    #[default]
    Rounded,
    Angular,
}

/// [graph] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_palette_size")]
    pub palette_size: usize,
    #[serde(default)]
    pub style: GraphStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuteConfig {
    #[serde(default = "default_true")]
    pub merge_commits: bool,
    #[serde(default)]
    pub commits_not_ancestors_of_head: bool,
}

/// [load] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_initial_commits")]
    pub initial_commits: usize,
    #[serde(default = "default_load_more_commits")]
    pub load_more_commits: usize,
    /// Load the next page when the selection reaches the end of the list
    #[serde(default = "default_true")]
    pub auto_load_more: bool,
}

/// Global values behind each repository's boolean overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDefaults {
    #[serde(default = "default_true")]
    pub show_remote_branches: bool,
    #[serde(default = "default_true")]
    pub show_tags: bool,
    #[serde(default = "default_true")]
    pub show_stashes: bool,
    #[serde(default)]
    pub include_reflog_commits: bool,
    #[serde(default)]
    pub only_follow_first_parent: bool,
    #[serde(default)]
    pub commit_ordering: CommitOrdering,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnRepoLoadConfig {
    #[serde(default)]
    pub show_checked_out_branch: bool,
    #[serde(default)]
    pub show_specific_branches: Vec<String>,
    #[serde(default)]
    pub scroll_to_head: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchGlob {
    pub name: String,
    pub glob: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepoOrder {
    #[default]
    FullPath,
    Name,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReposConfig {
    #[serde(default)]
    pub order: RepoOrder,
}

/// [watch] section configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Seconds between background repo-info polls; 0 disables polling
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_palette_size() -> usize {
    8
}

fn default_initial_commits() -> usize {
    300
}

fn default_load_more_commits() -> usize {
    100
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_poll_secs() -> u64 {
    30
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            palette_size: default_palette_size(),
            style: GraphStyle::default(),
        }
    }
}

impl Default for MuteConfig {
    fn default() -> Self {
        Self {
            merge_commits: true,
            commits_not_ancestors_of_head: false,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            initial_commits: default_initial_commits(),
            load_more_commits: default_load_more_commits(),
            auto_load_more: true,
        }
    }
}

impl Default for RepoDefaults {
    fn default() -> Self {
        Self {
            show_remote_branches: true,
            show_tags: true,
            show_stashes: true,
            include_reflog_commits: false,
            only_follow_first_parent: false,
            commit_ordering: CommitOrdering::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
            poll_secs: default_poll_secs(),
        }
    }
}

impl LanesConfig {
    pub fn glob_patterns(&self) -> Vec<String> {
        self.branch_globs.iter().map(|g| g.glob.clone()).collect()
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("git-lanes/config.toml"))
}

/// Load config by merging global defaults with per-repo overrides.
/// Priority: per-repo `.lanes.toml` > global `~/.config/git-lanes/config.toml` > built-in defaults.
/// Merging is deep: individual fields within sections (e.g. `[load]`) override independently.
pub fn load_config(repo_root: &Path) -> LanesConfig {
    load_config_from(global_config_path().as_deref(), &repo_root.join(".lanes.toml"))
}

pub fn load_config_from(global_path: Option<&Path>, local_path: &Path) -> LanesConfig {
    let global_table = global_path.and_then(read_table);
    let local_table = read_table(local_path);

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            toml::Value::Table(global)
        }
        (Some(global), None) => toml::Value::Table(global),
        (None, Some(local)) => toml::Value::Table(local),
        (None, None) => return LanesConfig::default(),
    };

    match merged.try_into() {
        Ok(config) => config,
        Err(e) => {
            warn!("invalid config, using defaults: {e}");
            LanesConfig::default()
        }
    }
}

fn read_table(path: &Path) -> Option<toml::Table> {
    let content = std::fs::read_to_string(path).ok()?;
    match content.parse::<toml::Table>() {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("ignoring unparsable config {}: {e}", path.display());
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) =
            (base.get_mut(&key), &value)
        {
            deep_merge(base_table, overlay_table.clone());
            continue;
        }
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(None, &dir.path().join(".lanes.toml"));
        assert_eq!(config, LanesConfig::default());
        assert_eq!(config.load.initial_commits, 300);
        assert_eq!(config.load.load_more_commits, 100);
        assert!(config.mute.merge_commits);
    }

    #[test]
    fn local_overrides_single_field_of_global_section() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let local = dir.path().join(".lanes.toml");
        fs::write(&global, "[load]\ninitial_commits = 50\nload_more_commits = 20\n").unwrap();
        fs::write(&local, "[load]\ninitial_commits = 1000\n").unwrap();

        let config = load_config_from(Some(&global), &local);
        assert_eq!(config.load.initial_commits, 1000);
        assert_eq!(config.load.load_more_commits, 20);
    }

    #[test]
    fn branch_globs_and_enums_parse() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join(".lanes.toml");
        fs::write(
            &local,
            r#"
[repo_defaults]
commit_ordering = "topological"

[repos]
order = "name"

[[branch_globs]]
name = "Features"
glob = "feature/*"
"#,
        )
        .unwrap();

        let config = load_config_from(None, &local);
        assert_eq!(config.repo_defaults.commit_ordering, CommitOrdering::Topological);
        assert_eq!(config.repos.order, RepoOrder::Name);
        assert_eq!(config.glob_patterns(), vec!["feature/*".to_string()]);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join(".lanes.toml");
        fs::write(&local, "[load\nbroken").unwrap();
        assert_eq!(load_config_from(None, &local), LanesConfig::default());
    }

    #[test]
    fn deep_merge_replaces_non_table_values() {
        let mut base: toml::Table = "[watch]\nenabled = true\npoll_secs = 30\n".parse().unwrap();
        let overlay: toml::Table = "[watch]\nenabled = false\n".parse().unwrap();
        deep_merge(&mut base, overlay);
        let watch = base.get("watch").and_then(|w| w.as_table()).unwrap();
        assert_eq!(watch.get("enabled").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(watch.get("poll_secs").and_then(|v| v.as_integer()), Some(30));
    }
}
