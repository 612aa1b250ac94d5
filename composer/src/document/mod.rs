//! Composition documents
//!
//! Loading of composition documents and the [`QueryComposer`] that renders
//! their subjects into bound SQL.

mod composer;
mod types;

pub use composer::QueryComposer;
pub use types::{
    Composition, CompositionDoc, DocInfo, DocumentError, TokenDefinition, TokenParam,
};
