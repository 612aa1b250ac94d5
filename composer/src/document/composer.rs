//! Query composer
//!
//! Stateful builder over one composition document: accumulates conditions,
//! paging, ordering and registered tokens, then renders a subject template
//! and binds it for the configured dialect. One composer serves one request
//! and is not meant to be shared across threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::{CompositionDoc, DocumentError, TokenParam};
use crate::condition::{
    ConditionStatement, Connective, Expander, ExpanderRegistry, Filter, FilterPipeline,
    PipelineParams, apply_pipelines, combine, combine_and, where_and,
};
use crate::core::config::ComposerConfig;
use crate::core::constants::{TOKEN_FIELDS_PREFIX, TOKEN_HAVING, TOKEN_LIMIT, TOKEN_ORDER_BY, TOKEN_WHERE};
use crate::error::{ComposeError, Result};
use crate::sql::{BoundQuery, bind_named};
use crate::template::{OrderBy, SqlLimit, TokenContext, TokenEngine, TokenValue};

#[derive(Debug)]
pub struct QueryComposer {
    doc: CompositionDoc,
    config: ComposerConfig,
    conditions: ConditionStatement,
    limit: SqlLimit,
    order_by: Option<OrderBy>,
    tokens: BTreeMap<String, TokenValue>,
    pipelines: ExpanderRegistry,
}

impl QueryComposer {
    /// Composer configured from the document's own settings
    pub fn new(doc: CompositionDoc) -> std::result::Result<Self, DocumentError> {
        let config = ComposerConfig::from_settings(doc.settings.as_ref());
        Self::with_config(doc, config)
    }

    /// Composer with an explicit configuration. Default conditions of the
    /// document are translated with AND.
    pub fn with_config(
        doc: CompositionDoc,
        config: ComposerConfig,
    ) -> std::result::Result<Self, DocumentError> {
        let conditions =
            where_and(&doc.composition.default_conditions).map_err(DocumentError::Conditions)?;

        Ok(Self {
            conditions,
            limit: config.limit,
            order_by: None,
            tokens: BTreeMap::new(),
            pipelines: ExpanderRegistry::with_builtins(),
            doc,
            config,
        })
    }

    pub fn doc(&self) -> &CompositionDoc {
        &self.doc
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn conditions(&self) -> &ConditionStatement {
        &self.conditions
    }

    /// Bind a token declared in the document. The factory receives the
    /// declared params. Returns false, registering nothing, when the document
    /// does not declare `name`.
    pub fn register_token<F, V>(&mut self, name: &str, factory: F) -> bool
    where
        F: FnOnce(&[TokenParam]) -> V,
        V: Into<TokenValue>,
    {
        let Some(definition) = self.doc.composition.tokens.get(name) else {
            tracing::debug!(token = name, "Token not declared in document, skipping");
            return false;
        };
        let value = factory(&definition.params).into();
        self.tokens.insert(name.to_string(), value);
        true
    }

    /// Make a pipeline type available to the document's filter pipelines
    pub fn register_pipeline_type<F>(&mut self, pipeline_type: &str, factory: F) -> Result<()>
    where
        F: Fn(&PipelineParams) -> Result<Arc<dyn Expander>> + Send + Sync + 'static,
    {
        self.pipelines.register(pipeline_type, factory)
    }

    pub fn and_conditions(&mut self, stmt: &ConditionStatement) -> &mut Self {
        self.conditions = combine(Connective::And, [&self.conditions, stmt]);
        self
    }

    pub fn or_conditions(&mut self, stmt: &ConditionStatement) -> &mut Self {
        self.conditions = combine(Connective::Or, [&self.conditions, stmt]);
        self
    }

    pub fn set_conditions(&mut self, stmt: ConditionStatement) -> &mut Self {
        self.conditions = stmt;
        self
    }

    /// Translate `filters` through the document's pipelines and AND the
    /// result onto the current conditions
    pub fn add_filters(&mut self, filters: &[Filter], connective: Connective) -> Result<&mut Self> {
        let pipelines = self.pipelines_for(filters)?;
        let stmt = apply_pipelines(filters, connective, &pipelines)?;
        tracing::debug!(
            filters = filters.len(),
            pipelines = pipelines.len(),
            clause = stmt.clause(),
            "Added filters"
        );
        self.conditions = combine_and([&self.conditions, &stmt]);
        Ok(self)
    }

    /// Declared pipelines that at least one of `filters` targets
    fn pipelines_for(&self, filters: &[Filter]) -> Result<Vec<FilterPipeline>> {
        self.doc
            .composition
            .filter_pipelines
            .iter()
            .filter(|(attr, _)| filters.iter().any(|f| f.attribute() == attr.as_str()))
            .map(|(attr, definition)| self.pipelines.build(attr, definition))
            .collect()
    }

    pub fn limit(&mut self, offset: u64, size: u64) -> &mut Self {
        self.limit = SqlLimit::new(offset, size);
        self
    }

    pub fn order_by(&mut self, order: impl Into<OrderBy>) -> &mut Self {
        self.order_by = Some(order.into());
        self
    }

    /// Token context a subject is rendered against
    pub fn context(&self) -> TokenContext {
        let mut ctx = TokenContext::new();
        ctx.insert(TOKEN_WHERE, self.conditions.clone())
            .insert(TOKEN_HAVING, self.conditions.clone())
            .insert(
                TOKEN_LIMIT,
                self.limit.render_for(self.config.dialect.dialect()),
            );

        if let Some(order) = &self.order_by {
            ctx.insert(TOKEN_ORDER_BY, order.clone());
        }

        for (group, fields) in &self.doc.composition.fields {
            ctx.insert(format!("{}{}", TOKEN_FIELDS_PREFIX, group), fields.clone());
        }

        for (name, value) in &self.tokens {
            ctx.insert(name.clone(), value.clone());
        }

        ctx
    }

    /// Render subject `key` with `:name` markers left in place
    pub fn compose(&self, key: &str) -> Result<String> {
        let template = self
            .doc
            .subject(key)
            .ok_or_else(|| ComposeError::UnknownSubject(key.to_string()))?;

        let engine = TokenEngine::new(self.config.max_template_passes);
        let sql = engine.render(template, &self.context())?;
        tracing::debug!(subject = key, sql = %sql, "Composed subject");
        Ok(sql)
    }

    /// Render subject `key` and bind it for the configured dialect
    pub fn build(&self, key: &str) -> Result<BoundQuery> {
        let sql = self.compose(key)?;
        let bound = bind_named(&sql, self.conditions.arguments(), self.config.dialect.dialect())?;
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Operator, Sort};
    use crate::sql::Backend;
    use crate::template::TokenReplacer;
    use serde_json::json;

    const BASE_FIELDS: &str = r#"
        "fields": {
            "base": [
                {"name": "name", "expr": "users.name"},
                {"name": "age", "expr": "users.age"}
            ],
            "statistic": [
                {"name": "consume_times", "expr": "COUNT(orders.id)"},
                {"name": "consume_total", "expr": "SUM(orders.total_amount)"}
            ]
        }"#;

    fn composer(extra: &str) -> QueryComposer {
        let json = format!(
            r#"{{"info": {{"name": "example", "version": "1.0.0"}}, "composition": {{{}, {}}}}}"#,
            BASE_FIELDS, extra
        );
        QueryComposer::new(CompositionDoc::from_json(&json).unwrap()).unwrap()
    }

    const LIST: &str = r#""subject": {
        "list": "SELECT %fields.base, %fields.statistic FROM users LEFT JOIN orders ON orders.uid = users.uid %where GROUP BY users.uid %order_by %limit",
        "total": "SELECT count(users.uid) FROM users LEFT JOIN orders ON orders.uid = users.uid %where{!consume_total} GROUP BY users.uid %having{consume_total}"
    }"#;

    #[test]
    fn order_by_absent_until_set() {
        let c = composer(LIST);
        let err = c.build("list").unwrap_err();
        assert!(matches!(
            err,
            ComposeError::UnresolvedPlaceholder { ref placeholder } if placeholder == "order_by"
        ));
    }

    #[test]
    fn build_with_default_conditions() {
        let mut c = composer(&format!(
            r#""defaultConditions": [
                {{"attr": "users.name", "op": "contains", "val": "Barry"}},
                {{"attr": "order_status", "op": "in", "val": [4, 5, 6, 8]}}
            ], {}"#,
            LIST
        ));
        c.order_by(vec![Sort::asc("age")]).limit(0, 10);

        let bound = c.build("list").unwrap();
        assert_eq!(
            bound.sql,
            "SELECT users.name AS name, users.age AS age, COUNT(orders.id) AS consume_times, \
             SUM(orders.total_amount) AS consume_total FROM users LEFT JOIN orders ON orders.uid = users.uid \
             WHERE users.name LIKE ? AND order_status IN(?, ?, ?, ?) GROUP BY users.uid ORDER BY age ASC LIMIT 0, 10"
        );
        assert_eq!(
            bound.args,
            vec![json!("%Barry%"), json!(4), json!(5), json!(6), json!(8)]
        );
    }

    #[test]
    fn where_and_having_projection() {
        let mut c = composer(LIST);
        c.add_filters(
            &[
                Filter::new("users.name", Operator::Contains, "Barry"),
                Filter::new("consume_total", Operator::Greater, "28"),
            ],
            Connective::And,
        )
        .unwrap();

        assert_eq!(
            c.compose("total").unwrap(),
            "SELECT count(users.uid) FROM users LEFT JOIN orders ON orders.uid = users.uid \
             WHERE (users.name LIKE :users_name) GROUP BY users.uid HAVING (consume_total > :consume_total)"
        );

        let bound = c.build("total").unwrap();
        assert_eq!(bound.args, vec![json!("%Barry%"), json!("28")]);
    }

    #[test]
    fn add_filters_accumulates_with_and() {
        let mut c = composer(LIST);
        c.add_filters(
            &[
                Filter::new("users.name", Operator::Contains, "barry"),
                Filter::new("order_status", Operator::In, json!([1, 2, 4, 8])),
            ],
            Connective::Or,
        )
        .unwrap()
        .add_filters(&[Filter::new("users.age", Operator::Greater, 10)], Connective::Or)
        .unwrap();

        assert_eq!(
            c.conditions().clause(),
            "((users.name LIKE :users_name OR order_status IN(:order_status))) AND (users.age > :users_age)"
        );
    }

    #[test]
    fn fulltext_pipeline_from_document() {
        let mut c = composer(&format!(
            r#""filterPipelines": {{
                "attrs_fulltext": {{
                    "type": "fulltext",
                    "params": [{{"name": "fields", "value": ["product_spec", "product_unit_weight", "product_material"]}}]
                }}
            }}, {}"#,
            LIST
        ));
        c.add_filters(
            &[
                Filter::new("users.name", Operator::Contains, "barry"),
                Filter::new("order_status", Operator::In, json!([1, 2, 4, 8])),
                Filter::new("attrs_fulltext", Operator::Contains, "X11"),
            ],
            Connective::And,
        )
        .unwrap();
        c.order_by(Vec::<Sort>::new());

        let bound = c.build("list").unwrap();
        assert_eq!(
            bound.sql,
            "SELECT users.name AS name, users.age AS age, COUNT(orders.id) AS consume_times, \
             SUM(orders.total_amount) AS consume_total FROM users LEFT JOIN orders ON orders.uid = users.uid \
             WHERE ((product_spec LIKE ? OR product_unit_weight LIKE ? OR product_material LIKE ?) AND \
             (users.name LIKE ? AND order_status IN(?, ?, ?, ?))) GROUP BY users.uid LIMIT 0, 10"
        );
        assert_eq!(bound.args.len(), 8);
    }

    #[test]
    fn unknown_pipeline_type_fails_only_when_used() {
        let mut c = composer(&format!(
            r#""filterPipelines": {{"loc": {{"type": "geo"}}}}, {}"#,
            LIST
        ));
        assert!(
            c.add_filters(&[Filter::new("name", Operator::Equal, "x")], Connective::And)
                .is_ok()
        );

        let err = c
            .add_filters(&[Filter::new("loc", Operator::Equal, "x")], Connective::And)
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownPipelineType { .. }));

        c.register_pipeline_type("geo", |_: &PipelineParams| {
            Ok(Arc::new(crate::condition::FulltextExpander::new(["lat", "lng"])) as Arc<dyn Expander>)
        })
        .unwrap();
        c.add_filters(&[Filter::new("loc", Operator::Equal, 1)], Connective::And)
            .unwrap();
        assert!(c.conditions().clause().contains("lat = :lat OR lng = :lng"));

        let dup = c.register_pipeline_type("fulltext", |_: &PipelineParams| {
            Ok(Arc::new(crate::condition::FulltextExpander::new(["a"])) as Arc<dyn Expander>)
        });
        assert!(matches!(dup, Err(ComposeError::PipelineTypeRegistered { .. })));
    }

    struct Attrs(Vec<String>);

    impl TokenReplacer for Attrs {
        fn token_replace(&self) -> String {
            self.0
                .iter()
                .map(|a| format!("LEFT JOIN obj_attr AS {a} ON {a}.obj_sid = p.sid"))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    #[test]
    fn registered_tokens() {
        let mut c = composer(
            r#""tokens": {
                "attrs": {"params": [{"name": "weight", "value": "product_weight"}]}
            },
            "subject": {"list": "SELECT %fields.base FROM p %attrs %where"}"#,
        );

        assert!(matches!(
            c.compose("list"),
            Err(ComposeError::UnresolvedPlaceholder { .. })
        ));

        let registered = c.register_token("attrs", |params| {
            TokenValue::replacer(Attrs(params.iter().map(|p| p.value.clone()).collect()))
        });
        assert!(registered);
        assert!(!c.register_token("undeclared", |_| "x"));

        assert_eq!(
            c.compose("list").unwrap(),
            "SELECT users.name AS name, users.age AS age FROM p \
             LEFT JOIN obj_attr AS product_weight ON product_weight.obj_sid = p.sid"
        );
    }

    #[test]
    fn debug_lists_builder_state() {
        let c = composer(LIST);
        let debug = format!("{:?}", c);
        assert!(debug.starts_with("QueryComposer"));
        assert!(debug.contains("ExpanderRegistry"));
    }

    #[test]
    fn unknown_subject() {
        let c = composer(LIST);
        assert!(matches!(
            c.compose("detail"),
            Err(ComposeError::UnknownSubject(ref key)) if key == "detail"
        ));
    }

    #[test]
    fn postgres_binding_and_limit() {
        let json = format!(
            r#"{{"composition": {{{}, "subject": {{"list": "SELECT %fields.base FROM users %where %limit"}}}},
                "settings": {{"dialect": "postgres", "limit": {{"offset": 20, "size": 5}}}}}}"#,
            BASE_FIELDS
        );
        let mut c = QueryComposer::new(CompositionDoc::from_json(&json).unwrap()).unwrap();
        assert_eq!(c.config().dialect, Backend::Postgres);

        c.add_filters(
            &[Filter::new("users.age", Operator::Between, json!([18, 30]))],
            Connective::And,
        )
        .unwrap();
        let bound = c.build("list").unwrap();
        assert_eq!(
            bound.sql,
            "SELECT users.name AS name, users.age AS age FROM users \
             WHERE (users.age >= $1 AND users.age <= $2) LIMIT 5 OFFSET 20"
        );
        assert_eq!(bound.args, vec![json!(18), json!(30)]);
    }

    #[test]
    fn zero_pass_limit_in_settings_still_renders() {
        let json = format!(
            r#"{{"composition": {{{}, "subject": {{"list": "SELECT %fields.base FROM users %where"}}}},
                "settings": {{"maxTemplatePasses": 0}}}}"#,
            BASE_FIELDS
        );
        let c = QueryComposer::new(CompositionDoc::from_json(&json).unwrap()).unwrap();
        assert_eq!(c.config().max_template_passes, 16);
        assert_eq!(
            c.compose("list").unwrap(),
            "SELECT users.name AS name, users.age AS age FROM users"
        );
    }

    #[test]
    fn yaml_document_with_where_and_having() {
        let yaml = r#"
info:
  name: example
  version: 1.0.0
composition:
  fields:
    base:
      - name: name
        expr: users.name
        type: string
      - name: age
        expr: users.age
    statistic:
      - name: consume_times
        expr: COUNT(orders.id)
      - name: consume_total
        expr: SUM(orders.total_amount)
  subject:
    list: "SELECT %fields.base, %fields.statistic FROM users LEFT JOIN orders ON orders.uid = users.uid %where{!consume_total} GROUP BY users.uid %having{consume_total} %limit"
    total: "SELECT count(users.uid) FROM users LEFT JOIN order ON order.uid = users.uid %where GROUP BY users.uid"
"#;
        let mut c = QueryComposer::new(CompositionDoc::from_yaml(yaml).unwrap()).unwrap();
        let where_name = where_and(&[Filter::new("users.name", Operator::Contains, "Barry")]).unwrap();
        c.and_conditions(&where_name).limit(0, 10);

        let bound = c.build("list").unwrap();
        assert_eq!(
            bound.sql,
            "SELECT users.name AS name, users.age AS age, COUNT(orders.id) AS consume_times, \
             SUM(orders.total_amount) AS consume_total FROM users LEFT JOIN orders ON orders.uid = users.uid \
             WHERE (users.name LIKE ?) GROUP BY users.uid LIMIT 0, 10"
        );
        assert_eq!(bound.args, vec![json!("%Barry%")]);
    }

    #[test]
    fn set_and_or_conditions() {
        let mut c = composer(LIST);
        let a = where_and(&[Filter::new("a", Operator::Equal, 1)]).unwrap();
        let b = where_and(&[Filter::new("a", Operator::Equal, 2)]).unwrap();

        c.set_conditions(a.clone()).or_conditions(&b);
        assert_eq!(c.conditions().clause(), "(a = :a) OR (a = :a_1)");

        c.set_conditions(ConditionStatement::default()).and_conditions(&a);
        assert_eq!(c.conditions().clause(), "(a = :a)");
    }

    #[test]
    fn invalid_default_conditions() {
        let json = r#"{"composition": {"defaultConditions": [{"attr": "a", "op": "between", "val": 1}]}}"#;
        let err = QueryComposer::new(CompositionDoc::from_json(json).unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, DocumentError::Conditions(_)));
    }
}
