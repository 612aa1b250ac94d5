//! Statement combination
//!
//! Merges several condition statements under one connective. Argument names
//! are re-allocated against the accumulated arguments so no two statements
//! share a parameter, and fragments of the same logical attribute are
//! concatenated under a single key.

use std::collections::BTreeMap;

use super::allocator::allocate;
use super::statement::{Arguments, ConditionStatement, Fragments, Predicate, rename_markers};
use super::types::Connective;

/// Combine `statements` under `connective`.
///
/// Each non-empty statement is wrapped in parentheses; empty statements are
/// skipped entirely. Inputs are never modified.
pub fn combine<'a, I>(connective: Connective, statements: I) -> ConditionStatement
where
    I: IntoIterator<Item = &'a ConditionStatement>,
{
    let mut arguments = Arguments::new();
    let mut fragments = Fragments::new();
    let mut clauses: Vec<String> = Vec::new();
    let mut trees: Vec<Predicate> = Vec::new();
    let mut has_trees = true;

    for stmt in statements {
        if stmt.is_empty() {
            continue;
        }

        let mut renames = BTreeMap::new();
        for (key, value) in stmt.arguments() {
            let renamed = allocate(key, &arguments);
            if renamed != *key {
                renames.insert(key.clone(), renamed.clone());
            }
            arguments.insert(renamed, value.clone());
        }
        if !renames.is_empty() {
            tracing::trace!(renames = ?renames, "Renamed colliding parameters");
        }

        for (key, text) in stmt.fragments() {
            let text = rename_markers(text, &renames);
            match fragments.get_mut(key) {
                Some(existing) => {
                    existing.push_str(connective.separator());
                    existing.push_str(&text);
                }
                None => {
                    fragments.insert(key.clone(), text);
                }
            }
        }

        clauses.push(format!("({})", rename_markers(stmt.clause(), &renames)));

        match stmt.tree() {
            Some(tree) => trees.push(tree.clone().rename_markers(&renames).parenthesized()),
            None => has_trees = false,
        }
    }

    let clause = clauses.join(connective.separator());
    tracing::trace!(connective = %connective, parts = clauses.len(), "Combined statements");

    if has_trees {
        let combined = ConditionStatement::from_tree(
            Predicate::group(connective, trees),
            arguments,
            fragments,
        );
        debug_assert_eq!(combined.clause(), clause);
        combined
    } else {
        ConditionStatement::from_parts(clause, arguments, fragments)
    }
}

pub fn combine_and<'a, I>(statements: I) -> ConditionStatement
where
    I: IntoIterator<Item = &'a ConditionStatement>,
{
    combine(Connective::And, statements)
}

pub fn combine_or<'a, I>(statements: I) -> ConditionStatement
where
    I: IntoIterator<Item = &'a ConditionStatement>,
{
    combine(Connective::Or, statements)
}
