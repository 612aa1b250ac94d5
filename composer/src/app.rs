//! Command line application

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::condition::{Connective, Sort, parse_filters};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::ComposerConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG};
use crate::document::{CompositionDoc, QueryComposer};

/// Arguments of one `render` invocation
struct RenderRequest {
    subject: String,
    filters: Option<String>,
    connective: Connective,
    order_by: Vec<Sort>,
    tokens: Vec<(String, String)>,
    named: bool,
}

pub struct ComposerApp;

impl ComposerApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Commands::Render {
                doc,
                subject,
                filters,
                connective,
                order_by,
                tokens,
                named,
            } => {
                let request = RenderRequest {
                    subject,
                    filters,
                    connective,
                    order_by,
                    tokens,
                    named,
                };
                let output = Self::render(&cli_config, &doc, request)?;
                println!("{}", output);
            }
            Commands::Inspect { doc } => {
                let output = Self::inspect(&cli_config, &doc)?;
                println!("{}", output);
            }
        }

        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    fn load(cli: &CliConfig, path: &Path) -> Result<QueryComposer> {
        let doc = CompositionDoc::from_path(path)?;
        let config = ComposerConfig::load(doc.settings.as_ref(), cli)?;
        QueryComposer::with_config(doc, config)
            .with_context(|| format!("Failed to prepare composer for {}", path.display()))
    }

    fn render(cli: &CliConfig, path: &Path, request: RenderRequest) -> Result<String> {
        let mut composer = Self::load(cli, path)?;

        if let Some(json) = request.filters.as_deref() {
            let filters = parse_filters(json).context("Failed to parse --filters")?;
            composer
                .add_filters(&filters, request.connective)
                .context("Failed to apply filters")?;
        }

        if !request.order_by.is_empty() {
            composer.order_by(request.order_by);
        }

        for (name, text) in request.tokens {
            if !composer.register_token(&name, |_| text) {
                tracing::warn!(token = %name, "Token is not declared in the document, ignoring");
            }
        }

        let output = if request.named {
            let sql = composer
                .compose(&request.subject)
                .with_context(|| format!("Failed to compose subject '{}'", request.subject))?;
            json!({
                "sql": sql,
                "arguments": composer.conditions().arguments(),
            })
        } else {
            let bound = composer
                .build(&request.subject)
                .with_context(|| format!("Failed to build subject '{}'", request.subject))?;
            serde_json::to_value(&bound)?
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn inspect(cli: &CliConfig, path: &Path) -> Result<String> {
        let composer = Self::load(cli, path)?;
        let doc = composer.doc();
        let comp = &doc.composition;

        let pipelines: serde_json::Map<String, serde_json::Value> = comp
            .filter_pipelines
            .iter()
            .map(|(attr, def)| {
                (
                    attr.clone(),
                    json!({"type": def.pipeline_type, "combine": def.combine}),
                )
            })
            .collect();

        let output = json!({
            "name": doc.info.name,
            "version": doc.info.version,
            "subjects": comp.subject.keys().collect::<Vec<_>>(),
            "fields": comp.fields.keys().collect::<Vec<_>>(),
            "tokens": comp.tokens.keys().collect::<Vec<_>>(),
            "filterPipelines": pipelines,
            "defaultConditions": composer.conditions().clause(),
            "settings": composer.config(),
        });

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
