use crate::app::refresh::RefreshScope;
use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::debug;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Something the graph depends on changed
    Refresh { scope: RefreshScope, config_changes: bool },
    /// The watcher reported an error; live updates may have stopped
    Error(String),
}

/// What a single changed path asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub scope: RefreshScope,
    pub config_changes: bool,
}

impl Trigger {
    fn merge(self, other: Trigger) -> Trigger {
        let scope = if self.scope == other.scope {
            self.scope
        } else {
            RefreshScope::RepoInfoThenCommits
        };
        Trigger {
            scope,
            config_changes: self.config_changes || other.config_changes,
        }
    }
}

/// Map a changed path to the refresh it needs. Git internals other than
/// refs, HEAD, the index and the config are noise.
pub fn classify(root: &Path, path: &Path) -> Option<Trigger> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    if parts.first() != Some(&".git") {
        // Working tree edit: only the uncommitted row can change
        return Some(Trigger {
            scope: RefreshScope::CommitsOnly,
            config_changes: false,
        });
    }
    if parts.last().is_some_and(|p| p.ends_with(".lock")) {
        return None;
    }

    let refs = Trigger {
        scope: RefreshScope::RepoInfoThenCommits,
        config_changes: false,
    };
    match parts.get(1..).unwrap_or_default() {
        ["config"] => Some(Trigger {
            config_changes: true,
            ..refs
        }),
        ["HEAD"] | ["packed-refs"] | ["FETCH_HEAD"] => Some(refs),
        ["refs", ..] => Some(refs),
        ["logs", "refs", "stash"] => Some(refs),
        ["index"] => Some(Trigger {
            scope: RefreshScope::CommitsOnly,
            config_changes: false,
        }),
        _ => None,
    }
}

/// Fold a debounced batch into one trigger
pub fn classify_batch<'a>(root: &Path, paths: impl IntoIterator<Item = &'a Path>) -> Option<Trigger> {
    paths
        .into_iter()
        .filter_map(|p| classify(root, p))
        .reduce(Trigger::merge)
}

/// A debounced file watcher over a repository's working tree and git directory
pub struct FileWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start watching `root`. Batches of changes are debounced by
    /// `debounce_ms` milliseconds and sent as at most one event each.
    pub fn new(root: &Path, debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let root_buf: PathBuf = root.to_path_buf();
        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| {
                let event = match result {
                    Ok(events) => {
                        let paths = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .map(|e| e.path.as_path());
                        match classify_batch(&root_buf, paths) {
                            Some(t) => WatchEvent::Refresh {
                                scope: t.scope,
                                config_changes: t.config_changes,
                            },
                            None => return,
                        }
                    }
                    Err(e) => WatchEvent::Error(e.to_string()),
                };
                if tx.send(event).is_err() {
                    debug!("watch receiver closed");
                }
            },
        )
        .context("Failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        Ok(FileWatcher { _watcher: debouncer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trigger(scope: RefreshScope, config_changes: bool) -> Option<Trigger> {
        Some(Trigger { scope, config_changes })
    }

    #[test]
    fn working_tree_edits_reload_commits_only() {
        let root = Path::new("/repo");
        assert_eq!(
            classify(root, Path::new("/repo/src/main.rs")),
            make_trigger(RefreshScope::CommitsOnly, false)
        );
        assert_eq!(
            classify(root, Path::new("/repo/.git/index")),
            make_trigger(RefreshScope::CommitsOnly, false)
        );
    }

    #[test]
    fn ref_changes_reload_repo_info() {
        let root = Path::new("/repo");
        for p in [
            "/repo/.git/HEAD",
            "/repo/.git/packed-refs",
            "/repo/.git/refs/heads/main",
            "/repo/.git/refs/tags/v1",
            "/repo/.git/logs/refs/stash",
        ] {
            assert_eq!(
                classify(root, Path::new(p)),
                make_trigger(RefreshScope::RepoInfoThenCommits, false),
                "{p}"
            );
        }
    }

    #[test]
    fn config_edit_flags_config_changes() {
        assert_eq!(
            classify(Path::new("/repo"), Path::new("/repo/.git/config")),
            make_trigger(RefreshScope::RepoInfoThenCommits, true)
        );
    }

    #[test]
    fn git_noise_is_ignored() {
        let root = Path::new("/repo");
        assert_eq!(classify(root, Path::new("/repo/.git/objects/ab/cdef")), None);
        assert_eq!(classify(root, Path::new("/repo/.git/logs/HEAD")), None);
        assert_eq!(classify(root, Path::new("/repo/.git/refs/heads/main.lock")), None);
        assert_eq!(classify(root, Path::new("/elsewhere/file")), None);
    }

    #[test]
    fn batch_widens_to_cover_every_path() {
        let root = Path::new("/repo");
        let paths = [
            Path::new("/repo/a.txt"),
            Path::new("/repo/.git/objects/xx"),
            Path::new("/repo/.git/config"),
        ];
        assert_eq!(
            classify_batch(root, paths),
            make_trigger(RefreshScope::RepoInfoThenCommits, true)
        );
        assert_eq!(classify_batch(root, [Path::new("/repo/.git/objects/xx")]), None);
    }
}
