//! Token context
//!
//! Maps token names to the value substituted for `%name` placeholders. A
//! value is plain text or an object bound to one of two capabilities:
//! unconditional replace (`%name`) or parameterized replace (`%name{...}`).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Renders a token without parameters
pub trait TokenReplacer: Send + Sync {
    fn token_replace(&self) -> String;
}

/// Renders a token from the raw body of its `{params}` suffix.
///
/// Implementors also render without parameters, so a parameterized value can
/// stand behind both `%where` and `%where{!name}`.
pub trait ParameterizedTokenReplacer: TokenReplacer {
    fn token_replace_with_params(&self, params: &str, token: &str) -> String;
}

/// A value stored in the token context
#[derive(Clone)]
pub enum TokenValue {
    Text(String),
    Replace(Arc<dyn TokenReplacer>),
    Parameterized(Arc<dyn ParameterizedTokenReplacer>),
}

impl TokenValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn replacer<R: TokenReplacer + 'static>(replacer: R) -> Self {
        Self::Replace(Arc::new(replacer))
    }

    pub fn parameterized<R: ParameterizedTokenReplacer + 'static>(replacer: R) -> Self {
        Self::Parameterized(Arc::new(replacer))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Replace(_) => "replace",
            Self::Parameterized(_) => "parameterized",
        }
    }
}

impl fmt::Debug for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Replace(_) => f.write_str("Replace(..)"),
            Self::Parameterized(_) => f.write_str("Parameterized(..)"),
        }
    }
}

impl From<String> for TokenValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for TokenValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Named values available to one template render
#[derive(Debug, Clone, Default)]
pub struct TokenContext {
    values: HashMap<String, TokenValue>,
}

impl TokenContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TokenValue>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<TokenValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TokenValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
