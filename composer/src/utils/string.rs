//! String utility functions

/// Default maximum length for preview text (in characters)
pub const PREVIEW_MAX_LENGTH: usize = 200;

/// Truncate text to max length with ellipsis
pub fn truncate_preview(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_len {
        format!("{}...", text.chars().take(max_len).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Replace every run of whitespace (spaces, tabs, newlines) with a single
/// space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `key=value`, trimming both sides. `None` when there is no `=` or the
/// key is empty.
pub fn split_key_value(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview_short() {
        assert_eq!(truncate_preview("  hello  ", 10), "hello");
    }

    #[test]
    fn test_truncate_preview_long() {
        assert_eq!(truncate_preview("abcdef", 3), "abc...");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("\n  SELECT *\tFROM tb\n\n  WHERE  a = 1 "),
            "SELECT * FROM tb WHERE a = 1"
        );
    }

    #[test]
    fn test_collapse_whitespace_empty() {
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_split_key_value() {
        assert_eq!(
            split_key_value("join = LEFT JOIN b ON b.id = a.id"),
            Some(("join", "LEFT JOIN b ON b.id = a.id"))
        );
        assert_eq!(split_key_value("flag="), Some(("flag", "")));
        assert_eq!(split_key_value("=x"), None);
        assert_eq!(split_key_value("novalue"), None);
    }
}
