use crate::app::persist::write_atomic;
use crate::app::review::CodeReview;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Reviews untouched for this long are dropped
pub const REVIEW_EXPIRY_MS: u64 = 90 * 24 * 60 * 60 * 1000;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReviewFile {
    /// repo → review id → review
    #[serde(default)]
    repos: BTreeMap<String, BTreeMap<String, CodeReview>>,
}

/// Code review progress, keyed by repository and review id, kept in one JSON file
pub struct CodeReviewStore {
    path: PathBuf,
    data: ReviewFile,
}

impl CodeReviewStore {
    /// Open the store. A missing file starts empty; an unreadable one is
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("discarding code reviews in {}: {e}", path.display());
                ReviewFile::default()
            }),
            Err(_) => ReviewFile::default(),
        };
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, repo: &str, id: &str) -> Option<&CodeReview> {
        self.data.repos.get(repo)?.get(id)
    }

    /// Look up a review and mark it active
    pub fn touch(&mut self, repo: &str, id: &str) -> Result<Option<CodeReview>> {
        let Some(review) = self.data.repos.get_mut(repo).and_then(|r| r.get_mut(id)) else {
            return Ok(None);
        };
        review.last_active = now_ms();
        let review = review.clone();
        self.save()?;
        Ok(Some(review))
    }

    pub fn start(
        &mut self,
        repo: &str,
        id: &str,
        files: Vec<String>,
        last_viewed_file: Option<String>,
    ) -> Result<CodeReview> {
        let review = CodeReview {
            id: id.to_string(),
            remaining_files: files,
            last_viewed_file,
            last_active: now_ms(),
        };
        self.data
            .repos
            .entry(repo.to_string())
            .or_default()
            .insert(id.to_string(), review.clone());
        self.save()?;
        Ok(review)
    }

    /// Record progress. An empty remaining set ends the review.
    pub fn update(
        &mut self,
        repo: &str,
        id: &str,
        remaining_files: Vec<String>,
        last_viewed_file: Option<String>,
    ) -> Result<()> {
        if remaining_files.is_empty() {
            return self.end(repo, id);
        }
        let Some(review) = self.data.repos.get_mut(repo).and_then(|r| r.get_mut(id)) else {
            anyhow::bail!("The Code Review \"{id}\" could not be found.");
        };
        review.remaining_files = remaining_files;
        review.last_viewed_file = last_viewed_file;
        review.last_active = now_ms();
        self.save()
    }

    pub fn end(&mut self, repo: &str, id: &str) -> Result<()> {
        let Some(reviews) = self.data.repos.get_mut(repo) else {
            return Ok(());
        };
        if reviews.remove(id).is_none() {
            return Ok(());
        }
        if reviews.is_empty() {
            self.data.repos.remove(repo);
        }
        self.save()
    }

    /// Drop reviews inactive since before `now - REVIEW_EXPIRY_MS`.
    /// Returns how many were removed.
    pub fn expire(&mut self, now: u64) -> Result<usize> {
        let cutoff = now.saturating_sub(REVIEW_EXPIRY_MS);
        let mut removed = 0;
        for reviews in self.data.repos.values_mut() {
            let before = reviews.len();
            reviews.retain(|_, r| r.last_active >= cutoff);
            removed += before - reviews.len();
        }
        self.data.repos.retain(|_, reviews| !reviews.is_empty());
        if removed > 0 {
            debug!(removed, "expired code reviews");
            self.save()?;
        }
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data).context("Failed to encode code reviews")?;
        write_atomic(&self.path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(dir: &Path) -> CodeReviewStore {
        CodeReviewStore::open(dir.join("reviews.json"))
    }

    fn files(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn start_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        store.start("/repo", "abc", files(&["a.rs", "b.rs"]), None).unwrap();

        let reopened = make_store(tmp.path());
        let review = reopened.get("/repo", "abc").unwrap();
        assert_eq!(review.remaining_files, files(&["a.rs", "b.rs"]));
        assert!(reopened.get("/other", "abc").is_none());
    }

    #[test]
    fn update_records_progress() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        store.start("/repo", "abc", files(&["a.rs", "b.rs"]), None).unwrap();
        store
            .update("/repo", "abc", files(&["b.rs"]), Some("a.rs".into()))
            .unwrap();
        let review = store.get("/repo", "abc").unwrap();
        assert_eq!(review.remaining_files, files(&["b.rs"]));
        assert_eq!(review.last_viewed_file.as_deref(), Some("a.rs"));
    }

    #[test]
    fn update_with_nothing_remaining_ends_review() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        store.start("/repo", "abc", files(&["a.rs"]), None).unwrap();
        store.update("/repo", "abc", Vec::new(), None).unwrap();
        assert!(store.get("/repo", "abc").is_none());
    }

    #[test]
    fn update_of_unknown_review_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        assert!(store.update("/repo", "nope", files(&["a.rs"]), None).is_err());
    }

    #[test]
    fn ending_unknown_review_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        store.end("/repo", "nope").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn expire_drops_stale_reviews() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = make_store(tmp.path());
        store.start("/repo", "old", files(&["a.rs"]), None).unwrap();
        store.start("/repo", "new", files(&["a.rs"]), None).unwrap();
        let later = now_ms() + REVIEW_EXPIRY_MS + 1;
        if let Some(r) = store.data.repos.get_mut("/repo").and_then(|r| r.get_mut("new")) {
            r.last_active = later;
        }
        assert_eq!(store.expire(later).unwrap(), 1);
        assert!(store.get("/repo", "old").is_none());
        assert!(store.get("/repo", "new").is_some());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("reviews.json"), "{oops").unwrap();
        let store = make_store(tmp.path());
        assert!(store.get("/repo", "abc").is_none());
    }
}
