//! Clause projection
//!
//! Selects or drops attribute fragments of a statement before it is rendered
//! as a WHERE/HAVING clause. `%where{!a,b}` drops fragments `a` and `b`,
//! `%where{a,b}` keeps only them, `%where{*}` keeps everything.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::statement::{ConditionStatement, Fragments};
use crate::template::{ParameterizedTokenReplacer, TokenReplacer, TokenValue};
use crate::utils::string::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse the body of a `{...}` placeholder suffix
    pub fn parse(params: &str) -> Self {
        let split = |s: &str| -> Vec<String> {
            s.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect()
        };

        if let Some(rest) = params.strip_prefix('!') {
            return Self::Exclude(split(rest));
        }
        if params.trim() == "*" {
            return Self::All;
        }
        Self::Include(split(params))
    }

    /// Fragment keys to remove from a statement with these `fragments`
    pub fn dropped_keys(&self, fragments: &Fragments) -> BTreeSet<String> {
        match self {
            Self::All => BTreeSet::new(),
            Self::Include(fields) if fields.is_empty() => BTreeSet::new(),
            Self::Exclude(fields) => fields.iter().cloned().collect(),
            Self::Include(fields) => fragments
                .keys()
                .filter(|k| !fields.contains(*k))
                .cloned()
                .collect(),
        }
    }
}

impl ConditionStatement {
    /// Clause text with the projected-out fragments removed
    pub fn project(&self, projection: &Projection) -> String {
        let dropped = projection.dropped_keys(self.fragments());
        if dropped.is_empty() {
            return self.clause().to_string();
        }

        match self.tree() {
            Some(tree) => tree
                .retain(&|key| !dropped.contains(key))
                .map(|t| t.render())
                .unwrap_or_default(),
            None => {
                let texts = dropped.iter().filter_map(|k| self.fragment(k));
                remove_fragments(self.clause(), texts)
            }
        }
    }

    /// `WHERE <clause>` / `HAVING <clause>` after applying `params`, or empty
    /// text when nothing is left
    pub fn render_projected(&self, params: &str, token: &str) -> String {
        if self.is_empty() {
            return String::new();
        }

        let clause = self.project(&Projection::parse(params));
        tracing::trace!(token, params, clause = %clause, "Projected condition");
        if clause.is_empty() {
            return String::new();
        }
        format!("{} {}", clause_keyword(token), clause)
    }
}

fn clause_keyword(token: &str) -> &'static str {
    if token.eq_ignore_ascii_case("having") {
        "HAVING"
    } else {
        "WHERE"
    }
}

impl TokenReplacer for ConditionStatement {
    fn token_replace(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("WHERE {}", self.clause())
    }
}

impl ParameterizedTokenReplacer for ConditionStatement {
    fn token_replace_with_params(&self, params: &str, token: &str) -> String {
        self.render_projected(params, token)
    }
}

impl From<ConditionStatement> for TokenValue {
    fn from(stmt: ConditionStatement) -> Self {
        TokenValue::Parameterized(Arc::new(stmt))
    }
}

// =============================================================================
// Text removal for statements without a predicate tree
// =============================================================================

const CONNECTIVES: [&str; 2] = ["AND", "OR"];

/// Remove every fragment text from `clause`, then tidy up what is left
pub(crate) fn remove_fragments<'a>(clause: &str, fragments: impl IntoIterator<Item = &'a str>) -> String {
    let mut clause = clause.to_string();
    for fragment in fragments {
        match remove_fragment(&clause, fragment) {
            Some(rest) => clause = tidy(&rest),
            None => tracing::trace!(fragment, "Fragment text not found in clause"),
        }
    }
    clause
}

/// Remove one occurrence of `fragment` together with its wrapping
/// parentheses and one adjacent connective, left side first.
fn remove_fragment(clause: &str, fragment: &str) -> Option<String> {
    let start = find_bounded(clause, fragment)?;
    let mut s = start;
    let mut e = start + fragment.len();

    // Absorb `( fragment )` wrappers
    loop {
        let before = clause[..s].trim_end();
        let after = clause[e..].trim_start();
        if before.ends_with('(') && after.starts_with(')') {
            s = before.len() - 1;
            e = clause.len() - after.len() + 1;
        } else {
            break;
        }
    }

    let before = clause[..s].trim_end();
    for conn in CONNECTIVES {
        if let Some(head) = before.strip_suffix(conn)
            && head.chars().last().is_none_or(|c| c.is_whitespace() || c == ')')
        {
            return Some(format!("{}{}", head.trim_end(), &clause[e..]));
        }
    }

    let after = clause[e..].trim_start();
    for conn in CONNECTIVES {
        if let Some(tail) = after.strip_prefix(conn)
            && tail.chars().next().is_some_and(|c| c.is_whitespace() || c == '(')
        {
            return Some(format!("{}{}", &clause[..s], tail.trim_start()));
        }
    }

    Some(format!("{}{}", &clause[..s], &clause[e..]))
}

/// First occurrence of `needle` not glued to surrounding word characters
fn find_bounded(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let prev = haystack[..i].chars().last();
        let next = haystack[i + needle.len()..].chars().next();
        !prev.is_some_and(is_word) && !next.is_some_and(is_word)
    })
}

fn tidy_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"\(\s*\)", ""),
            (r"\(\s*(?:AND|OR)\s*\)", ""),
            (r"\(\s*(?:AND|OR)\s+", "("),
            (r"\s+(?:AND|OR)\s*\)", ")"),
            (r"\b(AND|OR)\s+(?:AND|OR)\b", "$1"),
            (r"^\s*(?:AND|OR)\b\s*", ""),
            (r"\s*\b(?:AND|OR)\s*$", ""),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("Invalid regex"), replacement))
        .collect()
    })
}

/// Collapse empty groups and dangling connectives until nothing changes
fn tidy(clause: &str) -> String {
    let mut current = collapse_whitespace(clause);
    loop {
        let mut next = current.clone();
        for (re, replacement) in tidy_rules() {
            next = re.replace_all(&next, *replacement).into_owned();
        }
        next = collapse_whitespace(&next);
        if next == current {
            return current;
        }
        current = next;
    }
}
