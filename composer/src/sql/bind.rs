//! Named parameter binding
//!
//! Rewrites `:name` markers into the dialect's positional placeholders and
//! flattens the argument map into positional order. Collection values take
//! one slot per element, so `IN(:fav)` with two values becomes `IN(?, ?)`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::SqlDialect;
use crate::condition::Arguments;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindError {
    #[error("Argument `{0}` referenced in query is not bound")]
    MissingArgument(String),

    #[error("Argument `{0}` is an empty collection")]
    EmptyCollection(String),
}

/// Driver-ready query with positional arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Bind `:name` markers in `sql` against `arguments`.
///
/// `::` casts and text inside single-quoted literals are copied unchanged.
pub fn bind_named(
    sql: &str,
    arguments: &Arguments,
    dialect: &dyn SqlDialect,
) -> Result<BoundQuery, BindError> {
    let mut out = String::with_capacity(sql.len());
    let mut args = Vec::new();
    let mut chars = sql.char_indices().peekable();
    let mut in_literal = false;

    while let Some((i, c)) = chars.next() {
        if in_literal {
            out.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                out.push(c);
            }
            ':' if chars.peek().is_some_and(|&(_, next)| next == ':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().is_some_and(|&(_, next)| is_name_char(next)) => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, next)) = chars.peek() {
                    if !is_name_char(next) {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                let name = &sql[start..end];
                bind_one(name, arguments, dialect, &mut out, &mut args)?;
            }
            _ => out.push(c),
        }
    }

    tracing::debug!(
        dialect = dialect.name(),
        args = args.len(),
        "Bound named parameters"
    );

    Ok(BoundQuery { sql: out, args })
}

fn bind_one(
    name: &str,
    arguments: &Arguments,
    dialect: &dyn SqlDialect,
    out: &mut String,
    args: &mut Vec<Value>,
) -> Result<(), BindError> {
    let value = arguments
        .get(name)
        .ok_or_else(|| BindError::MissingArgument(name.to_string()))?;

    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(BindError::EmptyCollection(name.to_string()));
            }
            for (n, item) in items.iter().enumerate() {
                if n > 0 {
                    out.push_str(", ");
                }
                args.push(item.clone());
                out.push_str(&dialect.placeholder(args.len()));
            }
        }
        other => {
            args.push(other.clone());
            out.push_str(&dialect.placeholder(args.len()));
        }
    }
    Ok(())
}
