use super::host::{Action, CommitsQuery, LoadError, RepoInfoQuery};
use super::model::{
    BranchConfig, Commit, CommitDetails, CommitRemote, CommitStash, CommitTag, CommitsPage,
    FileChange, FileStatus, RemoteConfig, RepoConfig, RepoInfo, Stash, UNCOMMITTED,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const FIELD_SEP: char = '\x1f';
/// Hash of the empty tree, used to diff a root commit
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%s";

// ── Running git ──

/// Run git in `repo` and return stdout. A non-zero exit becomes the trimmed stderr.
fn git<S: AsRef<OsStr>>(repo: &str, args: &[S]) -> Result<String, LoadError> {
    let printable: Vec<String> = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect();
    debug!(repo, args = %printable.join(" "), "git");

    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| LoadError::Spawn(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("git {} failed", printable.first().map(String::as_str).unwrap_or_default())
        } else {
            stderr
        };
        return Err(LoadError::Git(message));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_ok<S: AsRef<OsStr>>(repo: &str, args: &[S]) -> Option<String> {
    git(repo, args).ok().map(|out| out.trim().to_string())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Top-level directory of the repository containing `path`
pub fn repo_root(path: &str) -> Option<String> {
    git_ok(path, &["rev-parse", "--show-toplevel"]).filter(|root| !root.is_empty())
}

// ── Repo info ──

pub fn load_repo_info(repo: &str, query: &RepoInfoQuery) -> Result<RepoInfo, LoadError> {
    if repo_root(repo).is_none() {
        return Ok(RepoInfo::default());
    }

    let mut ref_args = vec!["for-each-ref", "--format=%(refname)", "refs/heads"];
    if query.show_remote_branches {
        ref_args.push("refs/remotes");
    }
    let refs = git(repo, &ref_args)?;
    let head = git_ok(repo, &["symbolic-ref", "--short", "-q", "HEAD"]).filter(|h| !h.is_empty());
    let remotes = parse_lines(&git(repo, &["remote"])?);
    let stashes = if query.show_stashes {
        load_stashes(repo)?
    } else {
        Vec::new()
    };

    Ok(RepoInfo {
        branches: parse_branch_refs(&refs, head.as_deref(), &query.hide_remotes),
        head,
        remotes,
        stashes,
        is_repo: true,
    })
}

fn load_stashes(repo: &str) -> Result<Vec<Stash>, LoadError> {
    if git_ok(repo, &["rev-parse", "--verify", "-q", "refs/stash"]).is_none() {
        return Ok(Vec::new());
    }
    let out = git(
        repo,
        &[
            "reflog",
            "--format=%H%x1f%P%x1f%gD%x1f%an%x1f%ae%x1f%at%x1f%s",
            "refs/stash",
            "--",
        ],
    )?;
    Ok(out.lines().filter_map(parse_stash_line).collect())
}

fn parse_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Branch names from `for-each-ref`: local names first with the checked-out
/// branch leading, then `remotes/<remote>/<name>` for visible remotes.
pub fn parse_branch_refs(out: &str, head: Option<&str>, hide_remotes: &[String]) -> Vec<String> {
    let mut local = Vec::new();
    let mut remote = Vec::new();
    for line in out.lines().map(str::trim) {
        if let Some(name) = line.strip_prefix("refs/heads/") {
            if Some(name) == head {
                local.insert(0, name.to_string());
            } else {
                local.push(name.to_string());
            }
        } else if let Some(name) = line.strip_prefix("refs/remotes/") {
            let owner = name.split('/').next().unwrap_or_default();
            if name.ends_with("/HEAD") || hide_remotes.iter().any(|r| r == owner) {
                continue;
            }
            remote.push(format!("remotes/{name}"));
        }
    }
    local.extend(remote);
    local
}

/// `hash ␟ parents ␟ stash@{n} ␟ author ␟ email ␟ date ␟ message`
pub fn parse_stash_line(line: &str) -> Option<Stash> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 7 {
        return None;
    }
    let parents: Vec<&str> = fields[1].split_whitespace().collect();
    Some(Stash {
        hash: fields[0].to_string(),
        base_hash: parents.first()?.to_string(),
        untracked_files_hash: parents.get(2).map(|p| p.to_string()),
        selector: fields[2].to_string(),
        author: fields[3].to_string(),
        email: fields[4].to_string(),
        date: fields[5].parse().unwrap_or(0),
        message: fields[6..].join(&FIELD_SEP.to_string()),
    })
}

// ── Commits ──

#[derive(Debug, Default)]
struct RefLabels {
    heads: HashMap<String, Vec<String>>,
    tags: HashMap<String, Vec<CommitTag>>,
    remotes: HashMap<String, Vec<CommitRemote>>,
    tag_names: Vec<String>,
}

pub fn load_commits(repo: &str, query: &CommitsQuery) -> Result<CommitsPage, LoadError> {
    if query.branches.as_ref().is_some_and(|b| b.is_empty()) {
        return Ok(CommitsPage {
            only_follow_first_parent: query.only_follow_first_parent,
            ..Default::default()
        });
    }

    let args = log_args(query);
    let out = git(repo, &args)?;
    let mut commits: Vec<Commit> = out.lines().filter_map(parse_log_line).collect();
    let more_available = commits.len() > query.max_commits;
    commits.truncate(query.max_commits);

    let refs_out = git(
        repo,
        &[
            "for-each-ref",
            "--format=%(objectname)%1f%(refname)%1f%(objecttype)%1f%(*objectname)",
        ],
    )?;
    let labels = parse_refs(&refs_out, query.show_remote_branches, &query.hide_remotes);
    for commit in &mut commits {
        if let Some(h) = labels.heads.get(&commit.hash) {
            commit.heads = h.clone();
        }
        if query.show_tags {
            if let Some(t) = labels.tags.get(&commit.hash) {
                commit.tags = t.clone();
            }
        }
        if let Some(r) = labels.remotes.get(&commit.hash) {
            commit.remotes = r.clone();
        }
    }

    insert_stashes(&mut commits, &query.stashes);

    let head = git_ok(repo, &["rev-parse", "--verify", "-q", "HEAD"]).filter(|h| !h.is_empty());
    if let Some(head_hash) = &head {
        if commits.iter().any(|c| &c.hash == head_hash) {
            let changes = git(repo, &["--no-optional-locks", "status", "--porcelain", "--untracked-files=all"])?;
            let count = changes.lines().filter(|l| !l.trim().is_empty()).count();
            if count > 0 {
                commits.insert(0, uncommitted_commit(head_hash, count));
            }
        }
    }

    Ok(CommitsPage {
        commits,
        head,
        tags: labels.tag_names,
        more_available,
        only_follow_first_parent: query.only_follow_first_parent,
    })
}

/// Arguments for the log command backing a commits query. One extra commit
/// is requested to learn whether more are available.
pub fn log_args(query: &CommitsQuery) -> Vec<String> {
    let mut args = vec![
        "-c".to_string(),
        "log.showSignature=false".to_string(),
        "log".to_string(),
        format!("--max-count={}", query.max_commits + 1),
        LOG_FORMAT.to_string(),
        query.ordering.git_flag().to_string(),
    ];
    if query.only_follow_first_parent {
        args.push("--first-parent".to_string());
    }
    match &query.branches {
        Some(branches) => args.extend(branches.iter().cloned()),
        None => {
            args.push("--branches".to_string());
            if query.show_tags {
                args.push("--tags".to_string());
            }
            if query.include_reflog_commits {
                args.push("--reflog".to_string());
            }
            if query.show_remote_branches {
                for hidden in &query.hide_remotes {
                    args.push(format!("--exclude=refs/remotes/{hidden}/*"));
                }
                args.push("--remotes".to_string());
            }
            args.push("HEAD".to_string());
        }
    }
    args.push("--".to_string());
    args
}

/// `hash ␟ parents ␟ author ␟ email ␟ date ␟ subject`
pub fn parse_log_line(line: &str) -> Option<Commit> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 6 || fields[0].is_empty() {
        return None;
    }
    Some(Commit {
        hash: fields[0].to_string(),
        parents: fields[1].split_whitespace().map(str::to_string).collect(),
        author: fields[2].to_string(),
        email: fields[3].to_string(),
        date: fields[4].parse().unwrap_or(0),
        message: fields[5..].join(&FIELD_SEP.to_string()),
        heads: Vec::new(),
        tags: Vec::new(),
        remotes: Vec::new(),
        stash: None,
    })
}

fn parse_refs(out: &str, show_remote_branches: bool, hide_remotes: &[String]) -> RefLabels {
    let mut labels = RefLabels::default();
    for line in out.lines() {
        let fields: Vec<&str> = line.split(FIELD_SEP).collect();
        if fields.len() < 4 {
            continue;
        }
        let (hash, refname, kind, peeled) = (fields[0], fields[1], fields[2], fields[3]);
        if let Some(name) = refname.strip_prefix("refs/heads/") {
            labels.heads.entry(hash.to_string()).or_default().push(name.to_string());
        } else if let Some(name) = refname.strip_prefix("refs/tags/") {
            let annotated = kind == "tag";
            let target = if annotated && !peeled.is_empty() { peeled } else { hash };
            labels.tags.entry(target.to_string()).or_default().push(CommitTag {
                name: name.to_string(),
                annotated,
            });
            labels.tag_names.push(name.to_string());
        } else if let Some(name) = refname.strip_prefix("refs/remotes/") {
            if !show_remote_branches || name.ends_with("/HEAD") {
                continue;
            }
            let owner = name.split('/').next().map(str::to_string);
            if owner.as_ref().is_some_and(|o| hide_remotes.contains(o)) {
                continue;
            }
            labels.remotes.entry(hash.to_string()).or_default().push(CommitRemote {
                name: name.to_string(),
                remote: owner,
            });
        }
    }
    labels
}

/// Place each stash whose base commit is loaded: by date, but never below its base.
pub fn insert_stashes(commits: &mut Vec<Commit>, stashes: &[Stash]) {
    for stash in stashes {
        if commits.iter().any(|c| c.hash == stash.hash) {
            continue;
        }
        let Some(base_row) = commits.iter().position(|c| c.hash == stash.base_hash) else {
            continue;
        };
        let by_date = commits
            .iter()
            .position(|c| !c.is_uncommitted() && c.date <= stash.date)
            .unwrap_or(commits.len());
        commits.insert(
            by_date.min(base_row),
            Commit {
                hash: stash.hash.clone(),
                parents: vec![stash.base_hash.clone()],
                author: stash.author.clone(),
                email: stash.email.clone(),
                date: stash.date,
                message: stash.message.clone(),
                heads: Vec::new(),
                tags: Vec::new(),
                remotes: Vec::new(),
                stash: Some(CommitStash {
                    selector: stash.selector.clone(),
                    base_hash: stash.base_hash.clone(),
                    untracked_files_hash: stash.untracked_files_hash.clone(),
                }),
            },
        );
    }
}

fn uncommitted_commit(head: &str, count: usize) -> Commit {
    Commit {
        hash: UNCOMMITTED.to_string(),
        parents: vec![head.to_string()],
        author: "*".to_string(),
        email: String::new(),
        date: now_secs(),
        message: format!("Uncommitted Changes ({count})"),
        heads: Vec::new(),
        tags: Vec::new(),
        remotes: Vec::new(),
        stash: None,
    }
}

// ── Config ──

pub fn load_config(repo: &str, remotes: &[String]) -> Result<RepoConfig, LoadError> {
    let out = git(repo, &["config", "--list", "--includes"])?;
    Ok(parse_config(&out, remotes))
}

/// Parse `git config --list`. Keys are case-insensitive except the
/// subsection (branch or remote name).
pub fn parse_config(out: &str, remotes: &[String]) -> RepoConfig {
    let mut config = RepoConfig::default();
    let mut remote_urls: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();

    for line in out.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.to_string();
        let (section, rest) = match key.split_once('.') {
            Some(parts) => parts,
            None => continue,
        };
        match section.to_ascii_lowercase().as_str() {
            "user" => match rest.to_ascii_lowercase().as_str() {
                "name" => config.user_name = Some(value),
                "email" => config.user_email = Some(value),
                _ => {}
            },
            "remote" if rest.eq_ignore_ascii_case("pushdefault") => config.push_default = Some(value),
            "remote" => {
                let Some((name, var)) = rest.rsplit_once('.') else {
                    continue;
                };
                let entry = remote_urls.entry(name.to_string()).or_default();
                match var.to_ascii_lowercase().as_str() {
                    "url" => entry.0 = Some(value),
                    "pushurl" => entry.1 = Some(value),
                    _ => {}
                }
            }
            "branch" => {
                let Some((name, var)) = rest.rsplit_once('.') else {
                    continue;
                };
                let entry = config.branches.entry(name.to_string()).or_insert_with(BranchConfig::default);
                match var.to_ascii_lowercase().as_str() {
                    "remote" => entry.remote = Some(value),
                    "pushremote" => entry.push_remote = Some(value),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    config.remotes = remotes
        .iter()
        .map(|name| {
            let (url, push_url) = remote_urls.remove(name).unwrap_or_default();
            RemoteConfig {
                name: name.clone(),
                url,
                push_url,
            }
        })
        .collect();
    config
}

// ── Details & comparison ──

pub fn load_commit_details(repo: &str, hash: &str, stash: Option<&CommitStash>) -> Result<CommitDetails, LoadError> {
    if hash == UNCOMMITTED {
        let file_changes = compare(repo, "HEAD", UNCOMMITTED)?;
        return Ok(CommitDetails {
            hash: UNCOMMITTED.to_string(),
            parents: git_ok(repo, &["rev-parse", "HEAD"]).into_iter().collect(),
            author: String::new(),
            email: String::new(),
            date: now_secs(),
            committer: String::new(),
            body: String::new(),
            file_changes,
        });
    }

    let out = git(
        repo,
        &[
            "-c",
            "log.showSignature=false",
            "show",
            "--quiet",
            "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%at%x1f%cn%x1f%B",
            hash,
        ],
    )?;
    let mut details = parse_details(&out).ok_or_else(|| LoadError::Git(format!("unable to read commit {hash}")))?;

    let base = match (stash, details.parents.first()) {
        (Some(s), _) => s.base_hash.clone(),
        (None, Some(parent)) => parent.clone(),
        (None, None) => EMPTY_TREE.to_string(),
    };
    details.file_changes = compare(repo, &base, hash)?;
    if let Some(untracked) = stash.and_then(|s| s.untracked_files_hash.as_deref()) {
        let files = git(repo, &["ls-tree", "-r", "--name-only", untracked])?;
        details.file_changes.extend(parse_lines(&files).into_iter().map(|path| FileChange {
            old_path: path.clone(),
            new_path: path,
            status: FileStatus::Untracked,
            additions: None,
            deletions: None,
        }));
    }
    Ok(details)
}

fn parse_details(out: &str) -> Option<CommitDetails> {
    let mut fields = out.splitn(7, FIELD_SEP);
    let hash = fields.next()?.trim().to_string();
    let parents = fields.next()?.split_whitespace().map(str::to_string).collect();
    let author = fields.next()?.to_string();
    let email = fields.next()?.to_string();
    let date = fields.next()?.parse().unwrap_or(0);
    let committer = fields.next()?.to_string();
    let body = fields.next().unwrap_or_default().trim_end().to_string();
    Some(CommitDetails {
        hash,
        parents,
        author,
        email,
        date,
        committer,
        body,
        file_changes: Vec::new(),
    })
}

/// Files changed from `from` to `to`; `to` may be the uncommitted sentinel
pub fn compare(repo: &str, from: &str, to: &str) -> Result<Vec<FileChange>, LoadError> {
    let mut range = vec![from.to_string()];
    if to != UNCOMMITTED {
        range.push(to.to_string());
    }

    let mut status_args = vec!["diff".to_string(), "--name-status".to_string(), "-M".to_string()];
    status_args.extend(range.iter().cloned());
    status_args.push("--".to_string());
    let mut numstat_args = vec!["diff".to_string(), "--numstat".to_string(), "-M".to_string()];
    numstat_args.extend(range);
    numstat_args.push("--".to_string());

    let mut changes = parse_name_status(&git(repo, &status_args)?);
    apply_numstat(&mut changes, &git(repo, &numstat_args)?);

    if to == UNCOMMITTED {
        let untracked = git(repo, &["ls-files", "--others", "--exclude-standard"])?;
        changes.extend(parse_lines(&untracked).into_iter().map(|path| FileChange {
            old_path: path.clone(),
            new_path: path,
            status: FileStatus::Untracked,
            additions: None,
            deletions: None,
        }));
    }
    Ok(changes)
}

pub fn parse_name_status(out: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for line in out.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            continue;
        }
        let status = match fields[0].chars().next() {
            Some('A') => FileStatus::Added,
            Some('D') => FileStatus::Deleted,
            Some('R') | Some('C') => FileStatus::Renamed,
            Some(_) => FileStatus::Modified,
            None => continue,
        };
        let (old_path, new_path) = match (status, fields.get(2)) {
            (FileStatus::Renamed, Some(new)) => (fields[1].to_string(), new.to_string()),
            _ => (fields[1].to_string(), fields[1].to_string()),
        };
        changes.push(FileChange {
            old_path,
            new_path,
            status,
            additions: None,
            deletions: None,
        });
    }
    changes
}

/// Attach `--numstat` counts. Both listings come from the same diff so they
/// share an order; binary files (`-`) keep no counts.
pub fn apply_numstat(changes: &mut [FileChange], out: &str) {
    let stats: Vec<(Option<usize>, Option<usize>)> = out
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let additions = fields.next()?;
            let deletions = fields.next()?;
            Some((additions.parse().ok(), deletions.parse().ok()))
        })
        .collect();
    if stats.len() != changes.len() {
        return;
    }
    for (change, (additions, deletions)) in changes.iter_mut().zip(stats) {
        change.additions = additions;
        change.deletions = deletions;
    }
}

// ── Actions ──

/// Git argument lists for an action, one per sub-operation
pub fn action_commands(action: &Action) -> Vec<Vec<String>> {
    fn cmd(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    match action {
        Action::CheckoutBranch { name, remote_branch } => match remote_branch {
            Some(rb) => vec![cmd(&["checkout", "-b", name, rb])],
            None => vec![cmd(&["checkout", name])],
        },
        Action::CheckoutCommit { hash } => vec![cmd(&["checkout", hash])],
        Action::CreateBranch { name, hash, checkout, force } => {
            if *checkout {
                vec![cmd(&["checkout", if *force { "-B" } else { "-b" }, name, hash])]
            } else if *force {
                vec![cmd(&["branch", "-f", name, hash])]
            } else {
                vec![cmd(&["branch", name, hash])]
            }
        }
        Action::DeleteBranch { name, force, delete_on_remotes } => {
            let mut cmds = vec![cmd(&["branch", if *force { "-D" } else { "-d" }, name])];
            for remote in delete_on_remotes {
                cmds.push(cmd(&["push", remote, "--delete", name]));
            }
            cmds
        }
        Action::RenameBranch { old_name, new_name } => vec![cmd(&["branch", "-m", old_name, new_name])],
        Action::DeleteRemoteBranch { name, remote } => vec![cmd(&["push", remote, "--delete", name])],
        Action::Merge { obj, no_fast_forward, squash, no_commit } => {
            let mut merge = cmd(&["merge", obj]);
            if *squash {
                merge.push("--squash".into());
            } else if *no_fast_forward {
                merge.push("--no-ff".into());
            }
            if *no_commit {
                merge.push("--no-commit".into());
            }
            let mut cmds = vec![merge];
            if *squash && !*no_commit {
                cmds.push(cmd(&["commit", "--no-edit"]));
            }
            cmds
        }
        Action::Rebase { obj, ignore_date } => {
            let mut rebase = cmd(&["rebase", obj]);
            if *ignore_date {
                rebase.push("--ignore-date".into());
            }
            vec![rebase]
        }
        Action::CherryPick { hash, parent_index, record_origin, no_commit } => {
            let mut pick = cmd(&["cherry-pick"]);
            if *no_commit {
                pick.push("--no-commit".into());
            }
            if *record_origin {
                pick.push("-x".into());
            }
            if *parent_index > 0 {
                pick.push("-m".into());
                pick.push(parent_index.to_string());
            }
            pick.push(hash.clone());
            vec![pick]
        }
        Action::Revert { hash, parent_index } => {
            let mut revert = cmd(&["revert", "--no-edit"]);
            if *parent_index > 0 {
                revert.push("-m".into());
                revert.push(parent_index.to_string());
            }
            revert.push(hash.clone());
            vec![revert]
        }
        Action::Reset { hash, mode } => vec![cmd(&["reset", mode.flag(), hash])],
        Action::DropCommit { hash } => vec![cmd(&["rebase", "--onto", &format!("{hash}^"), hash])],
        Action::AddTag { name, hash, message, force, push_to_remote } => {
            let mut tag = cmd(&["tag"]);
            if *force {
                tag.push("-f".into());
            }
            if let Some(message) = message {
                tag.extend(cmd(&["-a", name, "-m", message]));
            } else {
                tag.push(name.clone());
            }
            tag.push(hash.clone());
            let mut cmds = vec![tag];
            if let Some(remote) = push_to_remote {
                cmds.push(cmd(&["push", remote, &format!("refs/tags/{name}")]));
            }
            cmds
        }
        Action::DeleteTag { name, delete_on_remote } => {
            let mut cmds = vec![cmd(&["tag", "-d", name])];
            if let Some(remote) = delete_on_remote {
                cmds.push(cmd(&["push", remote, "--delete", &format!("refs/tags/{name}")]));
            }
            cmds
        }
        Action::PushTag { name, remotes } => remotes
            .iter()
            .map(|remote| cmd(&["push", remote, &format!("refs/tags/{name}")]))
            .collect(),
        Action::PushBranch { name, remotes, set_upstream, force } => remotes
            .iter()
            .map(|remote| {
                let mut push = cmd(&["push"]);
                if *set_upstream {
                    push.push("--set-upstream".into());
                }
                if *force {
                    push.push("--force-with-lease".into());
                }
                push.push(remote.clone());
                push.push(name.clone());
                push
            })
            .collect(),
        Action::PullBranch { name, remote, no_fast_forward, squash } => {
            let mut pull = cmd(&["pull", remote, name]);
            if *squash {
                pull.push("--squash".into());
            } else if *no_fast_forward {
                pull.push("--no-ff".into());
            }
            let mut cmds = vec![pull];
            if *squash {
                cmds.push(cmd(&["commit", "--no-edit"]));
            }
            cmds
        }
        Action::Fetch { remote, prune, prune_tags } => {
            let mut fetch = cmd(&["fetch"]);
            match remote {
                Some(remote) => fetch.push(remote.clone()),
                None => fetch.push("--all".into()),
            }
            if *prune {
                fetch.push("--prune".into());
                if *prune_tags {
                    fetch.push("--prune-tags".into());
                }
            }
            vec![fetch]
        }
        Action::FetchIntoLocalBranch { remote, remote_branch, local_branch, force } => {
            let mut fetch = cmd(&["fetch"]);
            if *force {
                fetch.push("-f".into());
            }
            fetch.push(remote.clone());
            fetch.push(format!("{remote_branch}:{local_branch}"));
            vec![fetch]
        }
        Action::PushStash { message, include_untracked } => {
            let mut push = cmd(&["stash", "push"]);
            if *include_untracked {
                push.push("--include-untracked".into());
            }
            if !message.is_empty() {
                push.push("--message".into());
                push.push(message.clone());
            }
            vec![push]
        }
        Action::ApplyStash { selector, reinstate_index } | Action::PopStash { selector, reinstate_index } => {
            let verb = if matches!(action, Action::PopStash { .. }) { "pop" } else { "apply" };
            let mut stash = cmd(&["stash", verb]);
            if *reinstate_index {
                stash.push("--index".into());
            }
            stash.push(selector.clone());
            vec![stash]
        }
        Action::DropStash { selector } => vec![cmd(&["stash", "drop", selector])],
        Action::BranchFromStash { name, selector } => vec![cmd(&["stash", "branch", name, selector])],
        Action::AddRemote { name, url, push_url, fetch } => {
            let mut cmds = vec![cmd(&["remote", "add", name, url])];
            if let Some(push_url) = push_url {
                cmds.push(cmd(&["remote", "set-url", name, "--push", push_url]));
            }
            if *fetch {
                cmds.push(cmd(&["fetch", name]));
            }
            cmds
        }
        Action::DeleteRemote { name } => vec![cmd(&["remote", "remove", name])],
        Action::EditRemote { old_name, new_name, old_url, new_url } => {
            let mut cmds = Vec::new();
            if old_name != new_name {
                cmds.push(cmd(&["remote", "rename", old_name, new_name]));
            }
            if old_url != new_url {
                match (old_url, new_url) {
                    (_, Some(url)) => cmds.push(cmd(&["remote", "set-url", new_name, url])),
                    (Some(url), None) => cmds.push(cmd(&["remote", "set-url", "--delete", new_name, url])),
                    (None, None) => {}
                }
            }
            cmds
        }
        Action::PruneRemote { name } => vec![cmd(&["remote", "prune", name])],
        Action::CleanUntrackedFiles { directories } => {
            vec![cmd(&["clean", if *directories { "-fd" } else { "-f" }])]
        }
    }
}

/// Run every sub-operation in order, stopping at the first failure unless
/// the sub-operations are independent (one per remote).
pub fn run_action(repo: &str, action: &Action) -> Vec<Option<String>> {
    let independent = matches!(action, Action::PushBranch { .. } | Action::PushTag { .. });
    let mut errors = Vec::new();
    for args in action_commands(action) {
        match git(repo, &args) {
            Ok(_) => errors.push(None),
            Err(e) => {
                errors.push(Some(e.to_string()));
                if !independent {
                    break;
                }
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::host::ResetMode;
    use crate::git::CommitOrdering;

    fn make_query() -> CommitsQuery {
        CommitsQuery {
            branches: None,
            max_commits: 300,
            show_tags: true,
            show_remote_branches: true,
            include_reflog_commits: false,
            only_follow_first_parent: false,
            ordering: CommitOrdering::Date,
            remotes: vec!["origin".into()],
            hide_remotes: Vec::new(),
            stashes: Vec::new(),
        }
    }

    fn make_commit(hash: &str, parents: &[&str], date: i64) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            date,
            message: hash.to_string(),
            heads: Vec::new(),
            tags: Vec::new(),
            remotes: Vec::new(),
            stash: None,
        }
    }

    #[test]
    fn parse_log_line_splits_fields() {
        let line = "abc\x1fp1 p2\x1fAda\x1fada@example.com\x1f1700000000\x1fMerge branch 'x'";
        let c = parse_log_line(line).unwrap();
        assert_eq!(c.hash, "abc");
        assert_eq!(c.parents, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(c.date, 1_700_000_000);
        assert_eq!(c.message, "Merge branch 'x'");
    }

    #[test]
    fn parse_log_line_root_commit_has_no_parents() {
        let c = parse_log_line("abc\x1f\x1fAda\x1fa@b\x1f1\x1finit").unwrap();
        assert!(c.parents.is_empty());
        assert!(parse_log_line("garbage").is_none());
    }

    #[test]
    fn log_args_for_all_branches() {
        let mut query = make_query();
        query.hide_remotes = vec!["fork".into()];
        let args = log_args(&query);
        assert!(args.contains(&"--max-count=301".to_string()));
        assert!(args.contains(&"--tags".to_string()));
        assert!(args.contains(&"--exclude=refs/remotes/fork/*".to_string()));
        let exclude = args.iter().position(|a| a.starts_with("--exclude")).unwrap();
        let remotes = args.iter().position(|a| a == "--remotes").unwrap();
        assert!(exclude < remotes);
        assert_eq!(args.last().map(String::as_str), Some("--"));
    }

    #[test]
    fn log_args_for_selected_branches() {
        let mut query = make_query();
        query.branches = Some(vec!["main".into(), "remotes/origin/dev".into()]);
        query.only_follow_first_parent = true;
        let args = log_args(&query);
        assert!(args.contains(&"--first-parent".to_string()));
        assert!(args.contains(&"remotes/origin/dev".to_string()));
        assert!(!args.contains(&"--branches".to_string()));
    }

    #[test]
    fn branch_refs_put_head_first_and_hide_remotes() {
        let out = "refs/heads/dev\nrefs/heads/main\nrefs/remotes/origin/HEAD\nrefs/remotes/origin/main\nrefs/remotes/fork/main\n";
        let branches = parse_branch_refs(out, Some("main"), &["fork".to_string()]);
        assert_eq!(branches, vec!["main", "dev", "remotes/origin/main"]);
    }

    #[test]
    fn refs_label_commits() {
        let out = "h1\x1frefs/heads/main\x1fcommit\x1f\n\
                   t1\x1frefs/tags/v1\x1ftag\x1fh1\n\
                   h2\x1frefs/tags/light\x1fcommit\x1f\n\
                   h1\x1frefs/remotes/origin/main\x1fcommit\x1f\n\
                   h1\x1frefs/remotes/origin/HEAD\x1fcommit\x1f\n";
        let labels = parse_refs(out, true, &[]);
        assert_eq!(labels.heads["h1"], vec!["main".to_string()]);
        assert_eq!(
            labels.tags["h1"],
            vec![CommitTag {
                name: "v1".into(),
                annotated: true
            }]
        );
        assert!(!labels.tags["h2"][0].annotated);
        assert_eq!(labels.remotes["h1"].len(), 1);
        assert_eq!(labels.remotes["h1"][0].remote.as_deref(), Some("origin"));
        assert_eq!(labels.tag_names, vec!["v1".to_string(), "light".to_string()]);
    }

    #[test]
    fn stash_line_reads_base_and_untracked() {
        let line = "s1\x1fb1 i1 u1\x1fstash@{0}\x1fAda\x1fa@b\x1f50\x1fWIP on main";
        let s = parse_stash_line(line).unwrap();
        assert_eq!(s.base_hash, "b1");
        assert_eq!(s.untracked_files_hash.as_deref(), Some("u1"));
        assert_eq!(s.selector, "stash@{0}");
    }

    #[test]
    fn stashes_are_inserted_above_their_base() {
        let mut commits = vec![
            make_commit("c2", &["c1"], 300),
            make_commit("c1", &["c0"], 200),
            make_commit("c0", &[], 100),
        ];
        let stash = Stash {
            hash: "s1".into(),
            base_hash: "c1".into(),
            untracked_files_hash: None,
            selector: "stash@{0}".into(),
            author: "Ada".into(),
            email: "a@b".into(),
            date: 250,
            message: "WIP".into(),
        };
        insert_stashes(&mut commits, &[stash.clone()]);
        let order: Vec<&str> = commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(order, vec!["c2", "s1", "c1", "c0"]);
        assert!(commits[1].is_stash());

        let mut newer = stash;
        newer.hash = "s2".into();
        newer.date = 10;
        insert_stashes(&mut commits, &[newer]);
        let row = commits.iter().position(|c| c.hash == "s2").unwrap();
        let base = commits.iter().position(|c| c.hash == "c1").unwrap();
        assert!(row < base);
    }

    #[test]
    fn stash_with_unloaded_base_is_skipped() {
        let mut commits = vec![make_commit("c0", &[], 100)];
        let stash = Stash {
            hash: "s1".into(),
            base_hash: "elsewhere".into(),
            untracked_files_hash: None,
            selector: "stash@{0}".into(),
            author: String::new(),
            email: String::new(),
            date: 0,
            message: String::new(),
        };
        insert_stashes(&mut commits, &[stash]);
        assert_eq!(commits.len(), 1);
    }

    #[test]
    fn config_list_is_parsed() {
        let out = "user.name=Ada\nuser.email=ada@example.com\nremote.origin.url=git@host:a.git\n\
                   remote.origin.pushurl=git@host:push.git\nremote.pushDefault=origin\n\
                   branch.feature.x.remote=origin\nbranch.main.pushRemote=fork\n";
        let config = parse_config(out, &["origin".to_string(), "fork".to_string()]);
        assert_eq!(config.user_name.as_deref(), Some("Ada"));
        assert_eq!(config.push_default.as_deref(), Some("origin"));
        assert_eq!(config.branches["feature.x"].remote.as_deref(), Some("origin"));
        assert_eq!(config.branches["main"].push_remote.as_deref(), Some("fork"));
        assert_eq!(config.remotes[0].push_url.as_deref(), Some("git@host:push.git"));
        assert_eq!(config.remotes[1].url, None);
    }

    #[test]
    fn name_status_and_numstat_are_combined() {
        let status = "M\tsrc/lib.rs\nA\tnew.txt\nR087\told.rs\tsrc/new.rs\nD\tgone.md\n";
        let numstat = "3\t1\tsrc/lib.rs\n10\t0\tnew.txt\n2\t2\told.rs => src/new.rs\n-\t-\tgone.md\n";
        let mut changes = parse_name_status(status);
        apply_numstat(&mut changes, numstat);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[2].status, FileStatus::Renamed);
        assert_eq!(changes[2].old_path, "old.rs");
        assert_eq!(changes[2].new_path, "src/new.rs");
        assert_eq!(changes[0].additions, Some(3));
        assert_eq!(changes[3].additions, None);
    }

    #[test]
    fn details_body_keeps_separators_out() {
        let out = "abc\x1fp1\x1fAda\x1fa@b\x1f42\x1fBob\x1fSubject\n\nBody line\n";
        let d = parse_details(out).unwrap();
        assert_eq!(d.committer, "Bob");
        assert_eq!(d.body, "Subject\n\nBody line");
        assert_eq!(d.date, 42);
    }

    #[test]
    fn push_runs_once_per_remote() {
        let action = Action::PushBranch {
            name: "main".into(),
            remotes: vec!["origin".into(), "fork".into()],
            set_upstream: true,
            force: false,
        };
        let cmds = action_commands(&action);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1], vec!["push", "--set-upstream", "fork", "main"]);
    }

    #[test]
    fn squash_merge_commits_afterwards() {
        let action = Action::Merge {
            obj: "dev".into(),
            no_fast_forward: true,
            squash: true,
            no_commit: false,
        };
        let cmds = action_commands(&action);
        assert_eq!(cmds[0], vec!["merge", "dev", "--squash"]);
        assert_eq!(cmds[1], vec!["commit", "--no-edit"]);
    }

    #[test]
    fn reset_and_drop_commands() {
        let reset = Action::Reset {
            hash: "abc".into(),
            mode: ResetMode::Hard,
        };
        assert_eq!(action_commands(&reset), vec![vec!["reset", "--hard", "abc"]]);
        let drop = Action::DropCommit { hash: "abc".into() };
        assert_eq!(action_commands(&drop), vec![vec!["rebase", "--onto", "abc^", "abc"]]);
    }

    #[test]
    fn edit_remote_renames_then_updates_url() {
        let action = Action::EditRemote {
            old_name: "origin".into(),
            new_name: "upstream".into(),
            old_url: Some("a".into()),
            new_url: None,
        };
        let cmds = action_commands(&action);
        assert_eq!(cmds[0], vec!["remote", "rename", "origin", "upstream"]);
        assert_eq!(cmds[1], vec!["remote", "set-url", "--delete", "upstream", "a"]);
    }

    // ── Against a real repository ──

    fn run(dir: &std::path::Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn loads_a_real_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        if !run(dir, &["init", "-q"]) {
            return;
        }
        assert!(run(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]));
        std::fs::write(dir.join("a.txt"), "one\n").unwrap();
        assert!(run(dir, &["add", "a.txt"]));
        assert!(run(dir, &["commit", "-q", "-m", "first"]));
        std::fs::write(dir.join("a.txt"), "one\ntwo\n").unwrap();
        assert!(run(dir, &["commit", "-q", "-am", "second"]));
        assert!(run(dir, &["tag", "v1"]));
        std::fs::write(dir.join("b.txt"), "dirty\n").unwrap();

        let repo = dir.to_str().unwrap();
        let info = load_repo_info(
            repo,
            &RepoInfoQuery {
                show_remote_branches: true,
                show_stashes: true,
                hide_remotes: Vec::new(),
            },
        )
        .unwrap();
        assert!(info.is_repo);
        assert_eq!(info.head.as_deref(), Some("main"));
        assert_eq!(info.branches, vec!["main".to_string()]);

        let page = load_commits(repo, &make_query()).unwrap();
        assert_eq!(page.commits.len(), 3);
        assert!(page.commits[0].is_uncommitted());
        assert_eq!(page.commits[1].message, "second");
        assert_eq!(page.commits[1].heads, vec!["main".to_string()]);
        assert_eq!(page.commits[1].tags[0].name, "v1");
        assert!(!page.more_available);

        let mut small = make_query();
        small.max_commits = 1;
        let page = load_commits(repo, &small).unwrap();
        assert!(page.more_available);

        let details = load_commit_details(repo, &page.commits[1].hash, None).unwrap();
        assert_eq!(details.file_changes.len(), 1);
        assert_eq!(details.file_changes[0].additions, Some(1));

        let uncommitted = load_commit_details(repo, UNCOMMITTED, None).unwrap();
        assert_eq!(uncommitted.file_changes[0].status, FileStatus::Untracked);
    }

    #[test]
    fn non_repository_reports_not_a_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let info = load_repo_info(
            tmp.path().to_str().unwrap(),
            &RepoInfoQuery {
                show_remote_branches: true,
                show_stashes: true,
                hide_remotes: Vec::new(),
            },
        )
        .unwrap();
        assert!(!info.is_repo);
    }
}
