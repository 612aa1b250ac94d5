//! Parameter name allocation
//!
//! Turns a candidate parameter name into one that is not yet used, by
//! bumping a trailing `_<digits>` counter.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

/// A set of names already handed out
pub trait UsedNames {
    fn is_used(&self, name: &str) -> bool;
}

impl<V> UsedNames for BTreeMap<String, V> {
    fn is_used(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl<V, S: BuildHasher> UsedNames for HashMap<String, V, S> {
    fn is_used(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl UsedNames for BTreeSet<String> {
    fn is_used(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl<S: BuildHasher> UsedNames for HashSet<String, S> {
    fn is_used(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Split `age_12` into `("age", Some(12))`. Names without a numeric suffix
/// (or with an empty base, like `_3`) come back whole.
pub fn split_numeric_suffix(name: &str) -> (&str, Option<u64>) {
    if let Some((base, suffix)) = name.rsplit_once('_')
        && !base.is_empty()
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && let Ok(counter) = suffix.parse::<u64>()
    {
        return (base, Some(counter));
    }
    (name, None)
}

/// Allocate a name that is not in `used`.
///
/// Returns `candidate` untouched when it is free. Otherwise the trailing
/// counter is incremented (`order_type` → `order_type_1`, `age_1` → `age_2`)
/// until a free name comes up. Every probe yields a distinct name, so the loop
/// ends after at most `used.len() + 1` probes. A counter that cannot be
/// incremented any further is treated as part of the name, so `n_<u64::MAX>`
/// continues as `n_<u64::MAX>_1`.
pub fn allocate<U: UsedNames + ?Sized>(candidate: &str, used: &U) -> String {
    if !used.is_used(candidate) {
        return candidate.to_string();
    }

    let (mut base, counter) = split_numeric_suffix(candidate);
    let mut counter = counter.unwrap_or(0);
    loop {
        counter = match counter.checked_add(1) {
            Some(next) => next,
            None => {
                base = candidate;
                1
            }
        };
        let name = format!("{}_{}", base, counter);
        if !used.is_used(&name) {
            return name;
        }
    }
}

/// Candidate parameter name for an attribute path (`tb.name` → `tb_name`)
pub fn parameter_name(attribute: &str) -> String {
    attribute.replace('.', "_")
}
