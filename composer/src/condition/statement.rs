//! Condition statement
//!
//! A rendered predicate (`clause`) with its named `arguments` and the
//! per-attribute `fragments` used for projection. Statements built by the
//! translator or the combinator also carry the predicate tree the clause was
//! rendered from, so projection can drop whole nodes instead of editing text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::Connective;

/// Bound values keyed by parameter name
pub type Arguments = BTreeMap<String, Value>;

/// Fragment text keyed by logical attribute key
pub type Fragments = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionStatement {
    clause: String,
    #[serde(default)]
    arguments: Arguments,
    #[serde(default, rename = "clauseFragments")]
    fragments: Fragments,
    #[serde(skip)]
    tree: Option<Predicate>,
}

impl ConditionStatement {
    /// Statement assembled from already rendered parts. It carries no tree,
    /// so projection falls back to removing fragment text from the clause.
    pub fn from_parts(clause: impl Into<String>, arguments: Arguments, fragments: Fragments) -> Self {
        Self {
            clause: clause.into(),
            arguments,
            fragments,
            tree: None,
        }
    }

    pub(crate) fn from_tree(tree: Option<Predicate>, arguments: Arguments, fragments: Fragments) -> Self {
        let clause = tree.as_ref().map(Predicate::render).unwrap_or_default();
        Self {
            clause,
            arguments,
            fragments,
            tree,
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn fragments(&self) -> &Fragments {
        &self.fragments
    }

    pub fn fragment(&self, key: &str) -> Option<&str> {
        self.fragments.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    pub(crate) fn tree(&self) -> Option<&Predicate> {
        self.tree.as_ref()
    }

    pub fn into_parts(self) -> (String, Arguments, Fragments) {
        (self.clause, self.arguments, self.fragments)
    }
}

/// Predicate tree behind a rendered clause
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Fragment {
        key: String,
        text: String,
    },
    Group {
        connective: Connective,
        parenthesized: bool,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    pub(crate) fn fragment(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Fragment {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Unparenthesized group, `None` when there is nothing to join
    pub(crate) fn group(connective: Connective, children: Vec<Predicate>) -> Option<Self> {
        if children.is_empty() {
            return None;
        }
        Some(Self::Group {
            connective,
            parenthesized: false,
            children,
        })
    }

    pub(crate) fn parenthesized(self) -> Self {
        Self::Group {
            connective: Connective::And,
            parenthesized: true,
            children: vec![self],
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Self::Fragment { text, .. } => out.push_str(text),
            Self::Group {
                connective,
                parenthesized,
                children,
            } => {
                if *parenthesized {
                    out.push('(');
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(connective.separator());
                    }
                    child.render_into(out);
                }
                if *parenthesized {
                    out.push(')');
                }
            }
        }
    }

    /// Rewrite parameter markers in every fragment
    pub(crate) fn rename_markers(self, renames: &BTreeMap<String, String>) -> Self {
        if renames.is_empty() {
            return self;
        }
        match self {
            Self::Fragment { key, text } => Self::Fragment {
                key,
                text: rename_markers(&text, renames),
            },
            Self::Group {
                connective,
                parenthesized,
                children,
            } => Self::Group {
                connective,
                parenthesized,
                children: children
                    .into_iter()
                    .map(|c| c.rename_markers(renames))
                    .collect(),
            },
        }
    }

    /// Keep only fragments whose key passes `keep`; groups left without
    /// children disappear along with their parentheses.
    pub(crate) fn retain(&self, keep: &dyn Fn(&str) -> bool) -> Option<Self> {
        match self {
            Self::Fragment { key, .. } => keep(key).then(|| self.clone()),
            Self::Group {
                connective,
                parenthesized,
                children,
            } => {
                let children: Vec<Predicate> =
                    children.iter().filter_map(|c| c.retain(keep)).collect();
                if children.is_empty() {
                    return None;
                }
                Some(Self::Group {
                    connective: *connective,
                    parenthesized: *parenthesized,
                    children,
                })
            }
        }
    }
}

fn marker_regex() -> &'static Regex {
    static RE_MARKER: OnceLock<Regex> = OnceLock::new();
    // `::` is a cast, never a marker
    RE_MARKER.get_or_init(|| Regex::new(r"::|:(\w+)").expect("Invalid regex"))
}

/// Rewrite `:old` markers to `:new` in one pass. Matching whole marker names
/// keeps `:age` from hitting the front of `:age_1`, and a single pass keeps a
/// fresh name from being renamed again.
pub(crate) fn rename_markers(text: &str, renames: &BTreeMap<String, String>) -> String {
    if renames.is_empty() {
        return text.to_string();
    }
    marker_regex()
        .replace_all(text, |caps: &Captures| match caps.get(1) {
            Some(name) => match renames.get(name.as_str()) {
                Some(renamed) => format!(":{}", renamed),
                None => caps[0].to_string(),
            },
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Parameter names referenced by `:name` markers, in order of appearance
pub fn marker_names(text: &str) -> Vec<String> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rename_respects_marker_boundaries() {
        let text = "age >= :age_1 AND age = :age";
        let out = rename_markers(text, &renames(&[("age", "age_3")]));
        assert_eq!(out, "age >= :age_1 AND age = :age_3");
    }

    #[test]
    fn rename_is_single_pass() {
        let text = "a = :age AND b = :age_1";
        let out = rename_markers(text, &renames(&[("age", "age_1"), ("age_1", "age_2")]));
        assert_eq!(out, "a = :age_1 AND b = :age_2");
    }

    #[test]
    fn rename_skips_casts() {
        let text = "created::date = :created";
        let out = rename_markers(text, &renames(&[("date", "x"), ("created", "created_1")]));
        assert_eq!(out, "created::date = :created_1");
    }

    #[test]
    fn marker_names_in_order() {
        assert_eq!(
            marker_names("fav IN(:fav) AND age >= :age_1 AND x IS NULL"),
            vec!["fav", "age_1"]
        );
    }

    #[test]
    fn tree_render_and_retain() {
        let inner = Predicate::group(
            Connective::Or,
            vec![
                Predicate::fragment("a", "a = :a"),
                Predicate::fragment("b", "b = :b"),
            ],
        )
        .unwrap();
        let tree = Predicate::group(
            Connective::And,
            vec![
                inner.parenthesized(),
                Predicate::fragment("c", "c IS NULL").parenthesized(),
            ],
        )
        .unwrap();

        assert_eq!(tree.render(), "(a = :a OR b = :b) AND (c IS NULL)");

        let without_c = tree.retain(&|k| k != "c").unwrap();
        assert_eq!(without_c.render(), "(a = :a OR b = :b)");

        let only_b = tree.retain(&|k| k == "b").unwrap();
        assert_eq!(only_b.render(), "(b = :b)");

        assert!(tree.retain(&|_| false).is_none());
    }

    #[test]
    fn statement_from_parts_has_no_tree() {
        let stmt = ConditionStatement::from_parts("x = :x", Arguments::new(), Fragments::new());
        assert!(stmt.tree().is_none());
        assert_eq!(stmt.clause(), "x = :x");
        assert!(!stmt.is_empty());
    }

    #[test]
    fn default_statement_is_empty() {
        let stmt = ConditionStatement::default();
        assert!(stmt.is_empty());
        assert!(stmt.arguments().is_empty());
        assert!(stmt.fragments().is_empty());
    }

    #[test]
    fn statement_deserializes_without_tree() {
        let stmt: ConditionStatement = serde_json::from_str(
            r#"{"clause": "a = :a", "arguments": {"a": 1}, "clauseFragments": {"a": "a = :a"}}"#,
        )
        .unwrap();
        assert_eq!(stmt.fragment("a"), Some("a = :a"));
        assert!(stmt.tree().is_none());
    }
}
