//! Placeholder scanning
//!
//! A placeholder is `%name` where the name is ASCII word or dot characters,
//! optionally followed by `{params}`: `*`, `!a,b` or `a,b`.

use std::sync::OnceLock;

use regex::Regex;

fn placeholder_regex() -> &'static Regex {
    static RE_PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    RE_PLACEHOLDER.get_or_init(|| {
        Regex::new(r"(?-u)%([\w.]+)(\{[\w*!]+(?:,[\w*!]+)*\})?").expect("Invalid regex")
    })
}

/// One placeholder occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Full matched text, e.g. `%where{!lang}`
    pub raw: String,
    /// Token name, e.g. `where`
    pub name: String,
    /// Body of the `{...}` suffix without braces, e.g. `!lang`
    pub params: Option<String>,
    /// Byte range of `raw` in the scanned text
    pub start: usize,
    pub end: usize,
}

impl Placeholder {
    pub fn has_params(&self) -> bool {
        self.params.is_some()
    }
}

/// All placeholders in `text`, left to right
pub fn collect_placeholders(text: &str) -> Vec<Placeholder> {
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let params = caps.get(2).map(|m| {
                let body = m.as_str();
                body[1..body.len() - 1].to_string()
            });
            Some(Placeholder {
                raw: whole.as_str().to_string(),
                name: name.as_str().to_string(),
                params,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}
