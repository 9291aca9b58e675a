use serde::{Deserialize, Serialize};

/// Progress of reviewing one commit or one comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReview {
    pub id: String,
    pub remaining_files: Vec<String>,
    pub last_viewed_file: Option<String>,
    /// Unix milliseconds
    pub last_active: u64,
}

impl CodeReview {
    pub fn is_remaining(&self, path: &str) -> bool {
        self.remaining_files.iter().any(|f| f == path)
    }

    /// Returns true if the set changed
    pub fn mark_reviewed(&mut self, path: &str) -> bool {
        let before = self.remaining_files.len();
        self.remaining_files.retain(|f| f != path);
        before != self.remaining_files.len()
    }

    /// Returns true if the set changed
    pub fn mark_unreviewed(&mut self, path: &str) -> bool {
        if self.is_remaining(path) {
            return false;
        }
        self.remaining_files.push(path.to_string());
        true
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_files.is_empty()
    }
}

/// Review identity: the commit hash, or `from-to` for a comparison where
/// `from` is the older of the two commits.
pub fn review_id(commit_hash: &str, compare_with: Option<(&str, &str)>) -> String {
    match compare_with {
        Some((from, to)) => format!("{from}-{to}"),
        None => commit_hash.to_string(),
    }
}
