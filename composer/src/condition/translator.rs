//! Filter translation
//!
//! Builds one condition statement from a list of filters joined by a
//! connective. Each filter contributes one fragment and zero, one or two
//! named arguments.

use serde_json::Value;

use super::allocator::{UsedNames, allocate, parameter_name};
use super::statement::{Arguments, ConditionStatement, Fragments, Predicate};
use super::types::{Connective, Filter, Operator};
use crate::error::{ComposeError, Result};

/// Names already taken inside one translation: argument keys, fragment keys,
/// and the key of the filter being rendered.
struct Taken<'a> {
    arguments: &'a Arguments,
    fragments: &'a Fragments,
    pending: Option<&'a str>,
}

impl UsedNames for Taken<'_> {
    fn is_used(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
            || self.fragments.contains_key(name)
            || self.pending == Some(name)
    }
}

/// Translate `filters` into a statement joined by `connective`.
///
/// Fails with [`ComposeError::InvalidValueType`] when a value does not have
/// the shape its operator needs: LIKE-family values must be text, range
/// values a pair of integer, float or text bounds, and `In`/`NotIn` values a
/// collection.
pub fn translate(filters: &[Filter], connective: Connective) -> Result<ConditionStatement> {
    let mut arguments = Arguments::new();
    let mut fragments = Fragments::new();
    let mut leaves = Vec::with_capacity(filters.len());

    for filter in filters {
        let key = allocate(
            &parameter_name(filter.attribute()),
            &Taken {
                arguments: &arguments,
                fragments: &fragments,
                pending: None,
            },
        );

        let text = render_fragment(filter, &key, &mut arguments, &fragments)?;
        tracing::trace!(attribute = filter.attribute(), key = %key, fragment = %text, "Translated filter");

        fragments.insert(key.clone(), text.clone());
        leaves.push(Predicate::fragment(key, text));
    }

    Ok(ConditionStatement::from_tree(
        Predicate::group(connective, leaves),
        arguments,
        fragments,
    ))
}

pub fn where_and(filters: &[Filter]) -> Result<ConditionStatement> {
    translate(filters, Connective::And)
}

pub fn where_or(filters: &[Filter]) -> Result<ConditionStatement> {
    translate(filters, Connective::Or)
}

fn render_fragment(
    filter: &Filter,
    key: &str,
    arguments: &mut Arguments,
    fragments: &Fragments,
) -> Result<String> {
    let attr = filter.attribute();
    let op = filter.operator();

    let text = match op {
        Operator::Equal
        | Operator::NotEqual
        | Operator::Greater
        | Operator::Less
        | Operator::GreaterOrEqual
        | Operator::LessOrEqual => {
            arguments.insert(key.to_string(), filter.value().clone());
            format!("{} {} :{}", attr, comparison_sql(op), key)
        }
        Operator::StartsWith | Operator::Contains | Operator::EndsWith => {
            let Value::String(s) = filter.value() else {
                return Err(ComposeError::invalid_value(
                    attr,
                    op.as_str(),
                    "like operator value must be text",
                ));
            };
            let pattern = match op {
                Operator::StartsWith => format!("{}%", s),
                Operator::EndsWith => format!("%{}", s),
                _ => format!("%{}%", s),
            };
            arguments.insert(key.to_string(), Value::String(pattern));
            format!("{} LIKE :{}", attr, key)
        }
        Operator::In | Operator::NotIn => {
            if !filter.value().is_array() {
                return Err(ComposeError::invalid_value(
                    attr,
                    op.as_str(),
                    "set membership value must be a collection",
                ));
            }
            arguments.insert(key.to_string(), filter.value().clone());
            if op == Operator::In {
                format!("{} IN(:{})", attr, key)
            } else {
                format!("{} NOT IN(:{})", attr, key)
            }
        }
        Operator::Between | Operator::NotBetween => {
            let (low, high) = range_bounds(filter)?;

            let low_name = allocate(
                &format!("{}_1", key),
                &Taken {
                    arguments: &*arguments,
                    fragments,
                    pending: Some(key),
                },
            );
            arguments.insert(low_name.clone(), low);
            let high_name = allocate(
                &format!("{}_2", key),
                &Taken {
                    arguments: &*arguments,
                    fragments,
                    pending: Some(key),
                },
            );
            arguments.insert(high_name.clone(), high);

            if op == Operator::Between {
                format!("{attr} >= :{low_name} AND {attr} <= :{high_name}")
            } else {
                format!("{attr} <= :{low_name} AND {attr} >= :{high_name}")
            }
        }
        Operator::IsNull => format!("{} IS NULL", attr),
        Operator::IsNotNull => format!("{} IS NOT NULL", attr),
    };

    Ok(text)
}

fn comparison_sql(op: Operator) -> &'static str {
    match op {
        Operator::NotEqual => "<>",
        Operator::Greater => ">",
        Operator::Less => "<",
        Operator::GreaterOrEqual => ">=",
        Operator::LessOrEqual => "<=",
        _ => "=",
    }
}

/// Both ends of a range, each coerced by its own kind
fn range_bounds(filter: &Filter) -> Result<(Value, Value)> {
    let attr = filter.attribute();
    let op = filter.operator().as_str();

    let Value::Array(items) = filter.value() else {
        return Err(ComposeError::invalid_value(
            attr,
            op,
            "between operator value must be a pair",
        ));
    };
    let [low, high] = items.as_slice() else {
        return Err(ComposeError::invalid_value(
            attr,
            op,
            format!("between operator requires two values, got {}", items.len()),
        ));
    };

    let coerce = |v: &Value| {
        coerce_bound(v).ok_or_else(|| {
            ComposeError::invalid_value(
                attr,
                op,
                format!("between bound must be integer, float or text, got {}", v),
            )
        })
    };

    Ok((coerce(low)?, coerce(high)?))
}

fn coerce_bound(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Value::from(u))
            } else {
                n.as_f64().map(Value::from)
            }
        }
        Value::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}
