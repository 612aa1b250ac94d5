//! Filter pipelines
//!
//! A pipeline rewrites filters on one declared attribute through an
//! [`Expander`] before they are folded into the rest of the predicate. The
//! built-in `fulltext` expander fans a single filter out into an OR over a
//! configured list of columns.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::combinator::combine;
use super::statement::ConditionStatement;
use super::translator::{translate, where_or};
use super::types::{Connective, Filter};
use crate::error::{ComposeError, Result};

/// Pipeline type registered by [`ExpanderRegistry::with_builtins`]
pub const FULLTEXT_PIPELINE: &str = "fulltext";

/// Rewrites one filter into a sub-statement
pub trait Expander: std::fmt::Debug + Send + Sync {
    fn expand(&self, filter: &Filter) -> Result<ConditionStatement>;
}

/// Declares that filters on `attribute` go through `expander`, with the
/// result joined to the rest under `connective`
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    pub attribute: String,
    pub connective: Connective,
    pub expander: Arc<dyn Expander>,
}

impl FilterPipeline {
    pub fn new(
        attribute: impl Into<String>,
        connective: Connective,
        expander: impl Expander + 'static,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            connective,
            expander: Arc::new(expander),
        }
    }
}

/// Translate `filters`, routing those on a pipeline attribute through its
/// expander.
///
/// Filters without a pipeline are translated together under `connective`.
/// Each expanded filter is then combined with the running result, the
/// sub-statement first.
pub fn apply_pipelines(
    filters: &[Filter],
    connective: Connective,
    pipelines: &[FilterPipeline],
) -> Result<ConditionStatement> {
    let pipeline_for =
        |filter: &Filter| pipelines.iter().find(|p| p.attribute == filter.attribute());

    let rest: Vec<Filter> = filters
        .iter()
        .filter(|f| pipeline_for(f).is_none())
        .cloned()
        .collect();

    let mut stmt = translate(&rest, connective)?;
    if rest.len() == filters.len() {
        return Ok(stmt);
    }

    for filter in filters {
        let Some(pipeline) = pipeline_for(filter) else {
            continue;
        };
        let sub = pipeline.expander.expand(filter)?;
        tracing::debug!(
            attribute = filter.attribute(),
            clause = sub.clause(),
            "Expanded pipeline filter"
        );
        stmt = combine(pipeline.connective, [&sub, &stmt]);
    }

    Ok(stmt)
}

/// Fans one filter out into an OR over `fields`, keeping its operator and value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulltextExpander {
    fields: Vec<String>,
}

impl FulltextExpander {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Expander for FulltextExpander {
    fn expand(&self, filter: &Filter) -> Result<ConditionStatement> {
        if self.fields.is_empty() {
            return Err(ComposeError::Expansion {
                attribute: filter.attribute().to_string(),
                reason: "no target fields configured".to_string(),
            });
        }

        let filters: Vec<Filter> = self
            .fields
            .iter()
            .map(|field| filter.with_attribute(field.as_str()))
            .collect();
        where_or(&filters)
    }
}

// =============================================================================
// Declarations and factories
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParam {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineParams(pub Vec<PipelineParam>);

impl PipelineParams {
    /// First value declared under `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// Pipeline as declared in a composition document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(rename = "type")]
    pub pipeline_type: String,
    #[serde(default)]
    pub combine: Connective,
    #[serde(default)]
    pub params: PipelineParams,
}

/// Builds an expander from declared params
pub type ExpanderFactory = Arc<dyn Fn(&PipelineParams) -> Result<Arc<dyn Expander>> + Send + Sync>;

/// Expander factories keyed by pipeline type
#[derive(Clone, Default)]
pub struct ExpanderRegistry {
    factories: HashMap<String, ExpanderFactory>,
}

impl std::fmt::Debug for ExpanderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("ExpanderRegistry")
            .field("types", &types)
            .finish()
    }
}

impl ExpanderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `fulltext` type available
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            FULLTEXT_PIPELINE.to_string(),
            Arc::new(fulltext_factory) as ExpanderFactory,
        );
        registry
    }

    pub fn register<F>(&mut self, pipeline_type: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(&PipelineParams) -> Result<Arc<dyn Expander>> + Send + Sync + 'static,
    {
        let pipeline_type = pipeline_type.into();
        if self.factories.contains_key(&pipeline_type) {
            return Err(ComposeError::PipelineTypeRegistered { pipeline_type });
        }
        tracing::debug!(pipeline_type = %pipeline_type, "Registered pipeline type");
        self.factories.insert(pipeline_type, Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, pipeline_type: &str) -> bool {
        self.factories.contains_key(pipeline_type)
    }

    /// Resolve a declared pipeline on `attribute` into a runnable one
    pub fn build(&self, attribute: &str, definition: &PipelineDefinition) -> Result<FilterPipeline> {
        let factory = self.factories.get(&definition.pipeline_type).ok_or_else(|| {
            ComposeError::UnknownPipelineType {
                pipeline_type: definition.pipeline_type.clone(),
            }
        })?;

        Ok(FilterPipeline {
            attribute: attribute.to_string(),
            connective: definition.combine,
            expander: factory(&definition.params)?,
        })
    }
}

fn fulltext_factory(params: &PipelineParams) -> Result<Arc<dyn Expander>> {
    let invalid = |reason: &str| ComposeError::InvalidPipelineParams {
        pipeline_type: FULLTEXT_PIPELINE.to_string(),
        reason: reason.to_string(),
    };

    let Some(Value::Array(items)) = params.get("fields") else {
        return Err(invalid("`fields` must be a list of column names"));
    };

    let fields = items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| invalid("`fields` entries must be text"))?;

    Ok(Arc::new(FulltextExpander::new(fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::types::Operator;
    use serde_json::json;

    fn fulltext_pipeline() -> FilterPipeline {
        FilterPipeline::new(
            "attrs_fulltext",
            Connective::And,
            FulltextExpander::new(["product_spec", "product_unit_weight", "product_material"]),
        )
    }

    #[test]
    fn fulltext_expands_into_or() {
        let expander = FulltextExpander::new(["a", "b"]);
        let stmt = expander
            .expand(&Filter::new("search", Operator::Contains, "X11"))
            .unwrap();

        assert_eq!(stmt.clause(), "a LIKE :a OR b LIKE :b");
        assert_eq!(stmt.arguments().get("a"), Some(&json!("%X11%")));
        assert_eq!(stmt.arguments().get("b"), Some(&json!("%X11%")));
    }

    #[test]
    fn fulltext_without_fields_fails() {
        let expander = FulltextExpander::new(Vec::<String>::new());
        let err = expander
            .expand(&Filter::new("search", Operator::Equal, 1))
            .unwrap_err();
        assert!(matches!(err, ComposeError::Expansion { .. }));
    }

    #[test]
    fn pipeline_result_is_combined_first() {
        let filters = vec![
            Filter::new("users.name", Operator::Contains, "barry"),
            Filter::new("order_status", Operator::In, json!([1, 2, 4, 8])),
            Filter::new("attrs_fulltext", Operator::Contains, "X11"),
        ];

        let stmt = apply_pipelines(&filters, Connective::And, &[fulltext_pipeline()]).unwrap();
        assert_eq!(
            stmt.clause(),
            "(product_spec LIKE :product_spec OR product_unit_weight LIKE :product_unit_weight OR product_material LIKE :product_material) AND (users.name LIKE :users_name AND order_status IN(:order_status))"
        );
        assert_eq!(stmt.arguments().len(), 5);
        assert!(stmt.fragment("attrs_fulltext").is_none());
        assert_eq!(
            stmt.fragment("product_spec"),
            Some("product_spec LIKE :product_spec")
        );
    }

    #[test]
    fn no_matching_pipeline_translates_plainly() {
        let filters = vec![Filter::new("name", Operator::Equal, "wang")];
        let stmt = apply_pipelines(&filters, Connective::Or, &[fulltext_pipeline()]).unwrap();
        assert_eq!(stmt.clause(), "name = :name");
    }

    #[test]
    fn only_pipeline_filters() {
        let filters = vec![Filter::new("attrs_fulltext", Operator::Equal, "x")];
        let pipeline = FilterPipeline::new("attrs_fulltext", Connective::Or, FulltextExpander::new(["a"]));
        let stmt = apply_pipelines(&filters, Connective::And, &[pipeline]).unwrap();
        assert_eq!(stmt.clause(), "(a = :a)");
    }

    #[test]
    fn repeated_pipeline_filters_get_fresh_names() {
        let filters = vec![
            Filter::new("attrs_fulltext", Operator::Equal, "x"),
            Filter::new("attrs_fulltext", Operator::Equal, "y"),
        ];
        let pipeline = FilterPipeline::new("attrs_fulltext", Connective::And, FulltextExpander::new(["a"]));
        let stmt = apply_pipelines(&filters, Connective::And, &[pipeline]).unwrap();
        assert_eq!(stmt.clause(), "(a = :a) AND ((a = :a_1))");
        assert_eq!(stmt.arguments().get("a"), Some(&json!("y")));
        assert_eq!(stmt.arguments().get("a_1"), Some(&json!("x")));
    }

    #[test]
    fn registry_builds_fulltext() {
        let definition: PipelineDefinition = serde_json::from_value(json!({
            "type": "fulltext",
            "params": [{"name": "fields", "value": ["a", "b"]}]
        }))
        .unwrap();
        assert_eq!(definition.combine, Connective::And);
        assert_eq!(definition.params.get("fields"), Some(&json!(["a", "b"])));

        let registry = ExpanderRegistry::with_builtins();
        let pipeline = registry.build("search", &definition).unwrap();
        assert_eq!(pipeline.attribute, "search");
        let stmt = pipeline
            .expander
            .expand(&Filter::new("search", Operator::StartsWith, "ab"))
            .unwrap();
        assert_eq!(stmt.clause(), "a LIKE :a OR b LIKE :b");
    }

    #[test]
    fn registry_rejects_bad_fulltext_params() {
        let registry = ExpanderRegistry::with_builtins();
        let definition: PipelineDefinition = serde_json::from_value(json!({
            "type": "fulltext",
            "params": [{"name": "fields", "value": "a"}]
        }))
        .unwrap();
        assert!(matches!(
            registry.build("search", &definition),
            Err(ComposeError::InvalidPipelineParams { .. })
        ));
    }

    #[test]
    fn registry_unknown_and_duplicate_types() {
        let mut registry = ExpanderRegistry::with_builtins();
        let definition: PipelineDefinition =
            serde_json::from_value(json!({"type": "geo"})).unwrap();
        assert!(matches!(
            registry.build("loc", &definition),
            Err(ComposeError::UnknownPipelineType { pipeline_type }) if pipeline_type == "geo"
        ));

        let err = registry
            .register(FULLTEXT_PIPELINE, fulltext_factory)
            .unwrap_err();
        assert!(matches!(err, ComposeError::PipelineTypeRegistered { .. }));

        registry
            .register("geo", |_: &PipelineParams| {
                Ok(Arc::new(FulltextExpander::new(["lat", "lng"])) as Arc<dyn Expander>)
            })
            .unwrap();
        assert!(registry.contains("geo"));
        assert!(registry.build("loc", &definition).is_ok());
    }
}
