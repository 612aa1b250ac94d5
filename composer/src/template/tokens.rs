//! Built-in tokens
//!
//! Values the composer places into a template context: the page window,
//! the ordering and the field groups of a composition document.

use serde::{Deserialize, Serialize};

use super::context::{TokenReplacer, TokenValue};
use crate::condition::Sort;
use crate::core::constants::{DEFAULT_LIMIT_OFFSET, DEFAULT_LIMIT_SIZE};
use crate::sql::SqlDialect;

/// Page window rendered as `LIMIT <offset>, <size>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlLimit {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_limit_size")]
    pub size: u64,
}

fn default_limit_size() -> u64 {
    DEFAULT_LIMIT_SIZE
}

impl Default for SqlLimit {
    fn default() -> Self {
        Self {
            offset: DEFAULT_LIMIT_OFFSET,
            size: DEFAULT_LIMIT_SIZE,
        }
    }
}

impl SqlLimit {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// LIMIT clause in the syntax of `dialect`
    pub fn render_for(&self, dialect: &dyn SqlDialect) -> String {
        dialect.limit_offset(self.size, self.offset)
    }
}

impl TokenReplacer for SqlLimit {
    fn token_replace(&self) -> String {
        format!("LIMIT {}, {}", self.offset, self.size)
    }
}

impl From<SqlLimit> for TokenValue {
    fn from(limit: SqlLimit) -> Self {
        TokenValue::replacer(limit)
    }
}

/// ORDER BY terms; renders empty text when there are none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBy(pub Vec<Sort>);

impl OrderBy {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Sort>> for OrderBy {
    fn from(sorts: Vec<Sort>) -> Self {
        Self(sorts)
    }
}

impl TokenReplacer for OrderBy {
    fn token_replace(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .0
            .iter()
            .map(|s| format!("{} {}", s.name, s.direction.as_str()))
            .collect();
        format!("ORDER BY {}", terms.join(", "))
    }
}

impl From<OrderBy> for TokenValue {
    fn from(order: OrderBy) -> Self {
        TokenValue::replacer(order)
    }
}

/// One selectable field: `expr AS name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub expr: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
            field_type: None,
        }
    }
}

/// Comma-separated select list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldGroup(pub Vec<FieldDef>);

impl TokenReplacer for FieldGroup {
    fn token_replace(&self) -> String {
        self.0
            .iter()
            .map(|f| format!("{} AS {}", f.expr, f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<FieldGroup> for TokenValue {
    fn from(group: FieldGroup) -> Self {
        TokenValue::replacer(group)
    }
}
