//! Token templating
//!
//! Query skeletons reference named tokens as `%name` or `%name{params}`. A
//! [`TokenContext`] maps names to plain text or to objects that render
//! themselves, and [`TokenEngine`] substitutes them until no placeholder is
//! left.

mod context;
mod engine;
mod placeholder;
mod tokens;

pub use context::{ParameterizedTokenReplacer, TokenContext, TokenReplacer, TokenValue};
pub use engine::{TokenEngine, token_replace};
pub use placeholder::{Placeholder, collect_placeholders};
pub use tokens::{FieldDef, FieldGroup, OrderBy, SqlLimit};
