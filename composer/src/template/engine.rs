//! Token templating engine
//!
//! Substitutes every placeholder of a template from a [`TokenContext`], then
//! rescans the result, since substituted text may hold placeholders of its
//! own. Each pass collapses whitespace to single spaces. The number of passes
//! is bounded so a self-referencing context fails instead of looping.

use super::context::{TokenContext, TokenValue};
use super::placeholder::{Placeholder, collect_placeholders};
use crate::core::constants::DEFAULT_MAX_TEMPLATE_PASSES;
use crate::error::{ComposeError, Result};
use crate::utils::string::{PREVIEW_MAX_LENGTH, collapse_whitespace, truncate_preview};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEngine {
    max_passes: usize,
}

impl Default for TokenEngine {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_TEMPLATE_PASSES,
        }
    }
}

impl TokenEngine {
    pub fn new(max_passes: usize) -> Self {
        Self { max_passes }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Render `template` against `ctx`.
    ///
    /// A template without placeholders is returned as is.
    pub fn render(&self, template: &str, ctx: &TokenContext) -> Result<String> {
        let mut current = template.to_string();

        for pass in 1..=self.max_passes {
            let placeholders = collect_placeholders(&current);
            if placeholders.is_empty() {
                return Ok(current);
            }

            tracing::trace!(pass, placeholders = placeholders.len(), "Expanding template");
            current = collapse_whitespace(&self.expand_pass(&current, &placeholders, ctx)?);
        }

        if collect_placeholders(&current).is_empty() {
            return Ok(current);
        }

        tracing::debug!(
            limit = self.max_passes,
            text = %truncate_preview(&current, PREVIEW_MAX_LENGTH),
            "Template expansion did not converge"
        );
        Err(ComposeError::RecursionLimitExceeded {
            limit: self.max_passes,
        })
    }

    fn expand_pass(
        &self,
        text: &str,
        placeholders: &[Placeholder],
        ctx: &TokenContext,
    ) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for placeholder in placeholders {
            out.push_str(&text[cursor..placeholder.start]);
            out.push_str(&resolve(placeholder, ctx)?);
            cursor = placeholder.end;
        }
        out.push_str(&text[cursor..]);

        Ok(out)
    }
}

/// Substitution text of one placeholder
fn resolve(placeholder: &Placeholder, ctx: &TokenContext) -> Result<String> {
    let value = ctx
        .get(&placeholder.name)
        .ok_or_else(|| ComposeError::UnresolvedPlaceholder {
            placeholder: placeholder.name.clone(),
        })?;

    match (value, placeholder.params.as_deref()) {
        (TokenValue::Text(text), _) => Ok(text.clone()),
        (TokenValue::Replace(replacer), None) => Ok(replacer.token_replace()),
        (TokenValue::Parameterized(replacer), None) => Ok(replacer.token_replace()),
        (TokenValue::Parameterized(replacer), Some(params)) => {
            Ok(replacer.token_replace_with_params(params, &placeholder.name))
        }
        (TokenValue::Replace(_), Some(_)) => Err(ComposeError::CapabilityMismatch {
            placeholder: placeholder.raw.clone(),
            required: "parameterized replace",
        }),
    }
}

/// Render `template` with the default pass limit
pub fn token_replace(template: &str, ctx: &TokenContext) -> Result<String> {
    TokenEngine::default().render(template, ctx)
}
