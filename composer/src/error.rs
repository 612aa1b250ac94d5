//! Composer error types

use thiserror::Error;

use crate::sql::BindError;

/// Errors raised while translating filters, combining statements or rendering templates.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Invalid value for `{attribute}` ({operator}): {reason}")]
    InvalidValueType {
        attribute: String,
        operator: &'static str,
        reason: String,
    },

    #[error("Placeholder {placeholder} not defined in context")]
    UnresolvedPlaceholder { placeholder: String },

    #[error("Placeholder {placeholder} in context must support {required}")]
    CapabilityMismatch {
        placeholder: String,
        required: &'static str,
    },

    #[error("Pipeline type `{pipeline_type}` is not registered")]
    UnknownPipelineType { pipeline_type: String },

    #[error("Pipeline type `{pipeline_type}` is already registered")]
    PipelineTypeRegistered { pipeline_type: String },

    #[error("Invalid params for pipeline type `{pipeline_type}`: {reason}")]
    InvalidPipelineParams {
        pipeline_type: String,
        reason: String,
    },

    #[error("Expansion of `{attribute}` failed: {reason}")]
    Expansion { attribute: String, reason: String },

    #[error("Template expansion exceeded {limit} passes")]
    RecursionLimitExceeded { limit: usize },

    #[error("Subject `{0}` does not exist in composition document")]
    UnknownSubject(String),

    #[error("Parameter binding failed: {0}")]
    Bind(#[from] BindError),
}

impl ComposeError {
    pub(crate) fn invalid_value(
        attribute: &str,
        operator: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValueType {
            attribute: attribute.to_string(),
            operator,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;
