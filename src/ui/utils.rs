use std::time::{SystemTime, UNIX_EPOCH};

/// Simple word-wrap helper.
/// Uses `chars().count()` for the width check so multi-byte UTF-8 strings
/// are measured in characters, not bytes.
pub(crate) fn word_wrap(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
        } else {
            let mut current = String::new();
            for word in line.split_whitespace() {
                if current.is_empty() {
                    current = word.to_string();
                } else if current.chars().count() + 1 + word.chars().count() <= max_width {
                    current.push(' ');
                    current.push_str(word);
                } else {
                    result.push(current);
                    current = word.to_string();
                }
            }
            if !current.is_empty() {
                result.push(current);
            }
        }
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

/// Unix seconds as a relative age ("5m ago", "3d ago")
pub(crate) fn relative_age(date: i64, now: i64) -> String {
    let secs = (now - date).max(0);
    if secs < 60 {
        return format!("{secs}s ago");
    }
    if secs < 3600 {
        return format!("{}m ago", secs / 60);
    }
    if secs < 86400 {
        return format!("{}h ago", secs / 3600);
    }
    if secs < 86400 * 365 {
        return format!("{}d ago", secs / 86400);
    }
    format!("{}y ago", secs / (86400 * 365))
}

pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Cut to `width` characters, marking the cut with an ellipsis
pub(crate) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(word_wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(word_wrap("", 10), vec![String::new()]);
    }

    #[test]
    fn ages_pick_largest_unit() {
        assert_eq!(relative_age(100, 130), "30s ago");
        assert_eq!(relative_age(0, 7200), "2h ago");
        assert_eq!(relative_age(0, 86400 * 3), "3d ago");
        assert_eq!(relative_age(500, 100), "0s ago");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
