use super::cli;
use super::host::{Host, LoadError, Request, Response};
use super::reviews::{now_ms, CodeReviewStore};
use crate::app::review::{review_id, CodeReview};
use anyhow::{Context, Result};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Runs git requests one at a time on a background thread. Responses come
/// back on the receiver handed out by [`GitWorker::spawn`].
pub struct GitWorker {
    tx: Option<mpsc::Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

impl GitWorker {
    pub fn spawn(mut reviews: CodeReviewStore) -> Result<(Self, mpsc::Receiver<Response>)> {
        let (req_tx, req_rx) = mpsc::channel::<Request>();
        let (resp_tx, resp_rx) = mpsc::channel::<Response>();

        if let Err(e) = reviews.expire(now_ms()) {
            warn!("unable to expire old code reviews: {e:#}");
        }

        let handle = thread::Builder::new()
            .name("git-worker".into())
            .spawn(move || {
                for request in req_rx {
                    let response = handle_request(&mut reviews, request);
                    if let Some(response) = response {
                        if resp_tx.send(response).is_err() {
                            break;
                        }
                    }
                }
                debug!("git worker stopped");
            })
            .context("Failed to start git worker thread")?;

        Ok((
            Self {
                tx: Some(req_tx),
                handle: Some(handle),
            },
            resp_rx,
        ))
    }
}

impl Host for GitWorker {
    fn send(&mut self, request: Request) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(request).is_err() {
            warn!("git worker is gone; request dropped");
        }
    }
}

impl Drop for GitWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn review_lookup(reviews: &mut CodeReviewStore, repo: &str, id: &str) -> Option<CodeReview> {
    reviews.touch(repo, id).unwrap_or_else(|e| {
        warn!("unable to update code review {id}: {e:#}");
        reviews.get(repo, id).cloned()
    })
}

/// Execute one request. Returns None for requests nobody waits on.
pub fn handle_request(reviews: &mut CodeReviewStore, request: Request) -> Option<Response> {
    match request {
        Request::LoadRepoInfo { repo, id, query } => {
            let result = cli::load_repo_info(&repo, &query);
            Some(Response::RepoInfo { repo, id, result })
        }
        Request::LoadCommits { repo, id, query } => {
            let result = cli::load_commits(&repo, &query);
            Some(Response::Commits { repo, id, result })
        }
        Request::LoadConfig { repo, remotes } => {
            let result = cli::load_config(&repo, &remotes);
            Some(Response::Config { repo, result })
        }
        Request::CommitDetails {
            repo,
            hash,
            stash,
            refresh,
        } => {
            let result = cli::load_commit_details(&repo, &hash, stash.as_ref());
            let code_review = match &result {
                Ok(_) => review_lookup(reviews, &repo, &review_id(&hash, None)),
                Err(_) => None,
            };
            Some(Response::CommitDetails {
                repo,
                refresh,
                result,
                code_review,
            })
        }
        Request::CompareCommits {
            repo,
            commit_hash,
            compare_with_hash,
            from,
            to,
            refresh,
        } => {
            let result = cli::compare(&repo, &from, &to);
            let code_review = match &result {
                Ok(_) => review_lookup(reviews, &repo, &review_id(&commit_hash, Some((&from, &to)))),
                Err(_) => None,
            };
            Some(Response::CompareCommits {
                repo,
                commit_hash,
                compare_with_hash,
                refresh,
                result,
                code_review,
            })
        }
        Request::StartCodeReview {
            repo,
            id,
            files,
            last_viewed_file,
            commit_hash,
            compare_with_hash,
        } => {
            let result = reviews
                .start(&repo, &id, files, last_viewed_file)
                .map_err(|e| LoadError::Git(format!("{e:#}")));
            Some(Response::CodeReviewStarted {
                repo,
                commit_hash,
                compare_with_hash,
                result,
            })
        }
        Request::UpdateCodeReview {
            repo,
            id,
            remaining_files,
            last_viewed_file,
        } => {
            let error = reviews
                .update(&repo, &id, remaining_files, last_viewed_file)
                .err()
                .map(|e| format!("{e:#}"));
            Some(Response::CodeReviewUpdated { repo, error })
        }
        Request::EndCodeReview { repo, id } => {
            if let Err(e) = reviews.end(&repo, &id) {
                warn!("unable to end code review {id}: {e:#}");
            }
            None
        }
        Request::RunAction { repo, action } => {
            let errors = cli::run_action(&repo, &action);
            Some(Response::ActionFinished { repo, action, errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::host::RepoInfoQuery;

    fn make_reviews(dir: &std::path::Path) -> CodeReviewStore {
        CodeReviewStore::open(dir.join("reviews.json"))
    }

    #[test]
    fn review_requests_round_trip_through_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reviews = make_reviews(tmp.path());

        let started = handle_request(
            &mut reviews,
            Request::StartCodeReview {
                repo: "/repo".into(),
                id: "abc".into(),
                files: vec!["a.rs".into(), "b.rs".into()],
                last_viewed_file: None,
                commit_hash: "abc".into(),
                compare_with_hash: None,
            },
        );
        let Some(Response::CodeReviewStarted { result: Ok(review), .. }) = started else {
            panic!("expected a started review, got {started:?}");
        };
        assert_eq!(review.remaining_files.len(), 2);

        let updated = handle_request(
            &mut reviews,
            Request::UpdateCodeReview {
                repo: "/repo".into(),
                id: "abc".into(),
                remaining_files: vec!["b.rs".into()],
                last_viewed_file: Some("a.rs".into()),
            },
        );
        assert!(matches!(updated, Some(Response::CodeReviewUpdated { error: None, .. })));

        let ended = handle_request(
            &mut reviews,
            Request::EndCodeReview {
                repo: "/repo".into(),
                id: "abc".into(),
            },
        );
        assert!(ended.is_none());
        assert!(reviews.get("/repo", "abc").is_none());
    }

    #[test]
    fn updating_missing_review_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reviews = make_reviews(tmp.path());
        let updated = handle_request(
            &mut reviews,
            Request::UpdateCodeReview {
                repo: "/repo".into(),
                id: "missing".into(),
                remaining_files: vec!["a.rs".into()],
                last_viewed_file: None,
            },
        );
        assert!(matches!(updated, Some(Response::CodeReviewUpdated { error: Some(_), .. })));
    }

    #[test]
    fn worker_answers_over_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut worker, rx) = GitWorker::spawn(make_reviews(tmp.path())).unwrap();
        worker.send(Request::LoadRepoInfo {
            repo: tmp.path().to_string_lossy().into_owned(),
            id: 7,
            query: RepoInfoQuery {
                show_remote_branches: false,
                show_stashes: false,
                hide_remotes: Vec::new(),
            },
        });
        let response = rx.recv_timeout(std::time::Duration::from_secs(10)).unwrap();
        match response {
            Response::RepoInfo { id, result, .. } => {
                assert_eq!(id, 7);
                // Either git is missing or the directory is not a repository
                if let Ok(info) = result {
                    assert!(!info.is_repo);
                }
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
