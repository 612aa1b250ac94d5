//! Filter type definitions
//!
//! Defines the filter leaf, its operators and the boolean connectives used
//! when building condition statements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single predicate leaf: `attribute OP value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    attr: String,
    op: Operator,
    #[serde(default)]
    val: Value,
}

impl Filter {
    pub fn new(attr: impl Into<String>, op: Operator, val: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            op,
            val: val.into(),
        }
    }

    /// Filter whose operator takes no value (`IS NULL`, `IS NOT NULL`)
    pub fn unary(attr: impl Into<String>, op: Operator) -> Self {
        Self::new(attr, op, Value::Null)
    }

    /// Attribute path, dot-separated segments allowed (`tb.name`)
    pub fn attribute(&self) -> &str {
        &self.attr
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn value(&self) -> &Value {
        &self.val
    }

    /// Same operator and value, applied to a different attribute
    pub fn with_attribute(&self, attr: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            op: self.op,
            val: self.val.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<>")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "not_between")]
    NotBetween,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,
}

impl Operator {
    /// Wire tag of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::StartsWith => "starts_with",
            Self::Contains => "contains",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Number of bound arguments a fragment with this operator produces
    pub fn arity(&self) -> usize {
        match self {
            Self::IsNull | Self::IsNotNull => 0,
            Self::Between | Self::NotBetween => 2,
            _ => 1,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Greater
                | Self::Less
                | Self::GreaterOrEqual
                | Self::LessOrEqual
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean join between fragments or statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connective {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl Connective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Separator placed between joined parts: `" AND "` / `" OR "`
    pub fn separator(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Connective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(format!("Invalid connective: {}. Use 'and' or 'or'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Sort {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Desc,
        }
    }
}
