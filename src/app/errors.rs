/// Outcome of a batch of sub-operations, each of which may have failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedErrors {
    /// Every failure, separated by a blank line
    pub error: Option<String>,
    /// At least one sub-operation succeeded, so repository state may have changed
    pub partial_or_complete_success: bool,
}

pub fn reduce_errors(errors: &[Option<String>]) -> ReducedErrors {
    let mut error: Option<String> = None;
    let mut partial_or_complete_success = false;
    for e in errors {
        match e {
            Some(msg) => {
                error = Some(match error {
                    Some(prev) => format!("{prev}\n\n{msg}"),
                    None => msg.clone(),
                });
            }
            None => partial_or_complete_success = true,
        }
    }
    ReducedErrors {
        error,
        partial_or_complete_success,
    }
}

pub const NO_COMMITS_MESSAGE: &str = "There are no commits in this repository.";

/// A repository with no branches fails `git log HEAD`; say so plainly
pub fn commits_load_error(reason: &str, known_branches: usize) -> String {
    if known_branches == 0 && reason.contains("bad revision 'HEAD'") {
        NO_COMMITS_MESSAGE.to_string()
    } else {
        reason.to_string()
    }
}

/// An error surfaced to the user. `retry_hard_refresh` offers a retry that
/// reloads everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    pub retry_hard_refresh: bool,
}

impl ErrorNotice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            retry_hard_refresh: false,
        }
    }

    pub fn with_retry(mut self) -> Self {
        self.retry_hard_refresh = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_all_success() {
        let r = reduce_errors(&[None, None]);
        assert_eq!(r.error, None);
        assert!(r.partial_or_complete_success);
    }

    #[test]
    fn reduce_partial_failure_joins_with_blank_line() {
        let r = reduce_errors(&[Some("push to a failed".into()), None, Some("push to c failed".into())]);
        assert_eq!(r.error.as_deref(), Some("push to a failed\n\npush to c failed"));
        assert!(r.partial_or_complete_success);
    }

    #[test]
    fn reduce_total_failure_is_not_success() {
        let r = reduce_errors(&[Some("nope".into())]);
        assert_eq!(r.error.as_deref(), Some("nope"));
        assert!(!r.partial_or_complete_success);
    }

    #[test]
    fn reduce_empty_is_neither() {
        let r = reduce_errors(&[]);
        assert_eq!(r.error, None);
        assert!(!r.partial_or_complete_success);
    }

    #[test]
    fn empty_repo_error_is_rephrased() {
        let reason = "fatal: bad revision 'HEAD'";
        assert_eq!(commits_load_error(reason, 0), NO_COMMITS_MESSAGE);
        assert_eq!(commits_load_error(reason, 2), reason);
        assert_eq!(commits_load_error("other", 0), "other");
    }
}
