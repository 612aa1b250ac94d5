//! Condition composition
//!
//! Translates filter lists into parameterized predicates, merges predicates
//! without parameter name collisions, and projects them into WHERE/HAVING
//! clauses.
//!
//! ## Usage
//!
//! ```
//! use sqlcomposer::condition::{Filter, Operator, combine_and, where_and};
//!
//! let a = where_and(&[Filter::new("order_type", Operator::NotEqual, "1")]).unwrap();
//! let b = where_and(&[Filter::new("order_type", Operator::Equal, "2")]).unwrap();
//! let combined = combine_and([&a, &b]);
//! assert_eq!(
//!     combined.clause(),
//!     "(order_type <> :order_type) AND (order_type = :order_type_1)"
//! );
//! ```

mod allocator;
mod combinator;
mod parser;
mod pipeline;
mod projector;
mod statement;
mod translator;
mod types;

pub use allocator::{UsedNames, allocate, parameter_name, split_numeric_suffix};
pub use combinator::{combine, combine_and, combine_or};
pub use parser::{FilterParseError, parse_filters};
pub use pipeline::{
    Expander, ExpanderFactory, ExpanderRegistry, FULLTEXT_PIPELINE, FilterPipeline,
    FulltextExpander, PipelineDefinition, PipelineParam, PipelineParams, apply_pipelines,
};
pub use projector::Projection;
pub use statement::{Arguments, ConditionStatement, Fragments, marker_names};
pub use translator::{translate, where_and, where_or};
pub use types::{Connective, Direction, Filter, Operator, Sort};
