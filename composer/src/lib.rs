//! Parameterized SQL composition
//!
//! Filter lists become predicates with `:name` parameter markers, predicates
//! merge without marker collisions, and the result is spliced into query
//! templates through `%token` placeholders before being bound for a dialect.

pub mod app;
pub mod condition;
pub mod core;
pub mod document;
pub mod error;
pub mod sql;
pub mod template;
pub mod utils;

pub use condition::{ConditionStatement, Connective, Filter, Operator, Sort};
pub use document::{CompositionDoc, QueryComposer};
pub use error::{ComposeError, Result};
pub use template::{TokenContext, TokenEngine, TokenValue};
