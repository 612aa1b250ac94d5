use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{APP_NAME, ENV_DIALECT, ENV_DOC, ENV_MAX_PASSES};
use crate::condition::{Connective, Direction, Sort};
use crate::sql::Backend;
use crate::utils::string::split_key_value;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version, about = "Compose parameterized SQL from filter lists and query templates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQL dialect used when binding parameters (sqlite, mysql, postgres, duckdb)
    #[arg(long, short = 'd', global = true, env = ENV_DIALECT, value_parser = parse_backend)]
    pub dialect: Option<Backend>,

    /// Maximum number of template expansion passes
    #[arg(long, global = true, env = ENV_MAX_PASSES)]
    pub max_passes: Option<usize>,

    /// Page size of the %limit token
    #[arg(long, global = true)]
    pub limit: Option<u64>,

    /// Row offset of the %limit token
    #[arg(long, global = true)]
    pub offset: Option<u64>,
}

/// Parse dialect from CLI/env string
fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse()
}

/// Parse connective from CLI string
fn parse_connective(s: &str) -> Result<Connective, String> {
    s.parse()
}

/// Parse an ordering term: `name` or `name:asc|desc`
fn parse_sort(s: &str) -> Result<Sort, String> {
    let (name, direction) = match s.split_once(':') {
        Some((name, dir)) => {
            let direction = match dir.to_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                _ => {
                    return Err(format!(
                        "Invalid sort direction '{}'. Valid options: asc, desc",
                        dir
                    ));
                }
            };
            (name, direction)
        }
        None => (s, Direction::Asc),
    };
    if name.is_empty() {
        return Err("Sort field name cannot be empty".to_string());
    }
    Ok(Sort {
        name: name.to_string(),
        direction,
    })
}

/// Parse a text token: `name=TEXT`
fn parse_token(s: &str) -> Result<(String, String), String> {
    split_key_value(s)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Invalid token '{}'. Expected name=TEXT", s))
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Render a subject of a composition document into SQL
    Render {
        /// Path to the composition document (JSON, or YAML with a .yaml/.yml extension)
        #[arg(long, env = ENV_DOC)]
        doc: PathBuf,

        /// Subject key to render
        #[arg(long, short = 's')]
        subject: String,

        /// Filters as a JSON array of {"attr", "op", "val"} objects
        #[arg(long, short = 'f')]
        filters: Option<String>,

        /// Connective joining the filters (and, or)
        #[arg(long, default_value = "and", value_parser = parse_connective)]
        connective: Connective,

        /// Ordering term, repeatable (name or name:desc)
        #[arg(long = "order-by", value_parser = parse_sort)]
        order_by: Vec<Sort>,

        /// Extra text token, repeatable (name=TEXT)
        #[arg(long = "token", short = 't', value_parser = parse_token)]
        tokens: Vec<(String, String)>,

        /// Print the query with :name markers instead of binding it
        #[arg(long)]
        named: bool,
    },
    /// Show the subjects, tokens, pipelines and settings of a document
    Inspect {
        /// Path to the composition document (JSON, or YAML with a .yaml/.yml extension)
        #[arg(long, env = ENV_DOC)]
        doc: PathBuf,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub dialect: Option<Backend>,
    pub max_passes: Option<usize>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        dialect: cli.dialect,
        max_passes: cli.max_passes,
        limit: cli.limit,
        offset: cli.offset,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("age").unwrap(), Sort::asc("age"));
        assert_eq!(parse_sort("total:DESC").unwrap(), Sort::desc("total"));
        assert!(parse_sort("age:sideways").is_err());
        assert!(parse_sort(":desc").is_err());
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(
            parse_token("join=LEFT JOIN b ON b.id = a.id").unwrap(),
            ("join".to_string(), "LEFT JOIN b ON b.id = a.id".to_string())
        );
        assert!(parse_token("join").is_err());
    }

    #[test]
    fn test_cli_render_args() {
        let cli = Cli::try_parse_from([
            "sqlcomposer",
            "render",
            "--doc",
            "doc.json",
            "-s",
            "list",
            "--connective",
            "or",
            "--order-by",
            "age:desc",
            "-t",
            "join=LEFT JOIN b",
            "--dialect",
            "postgres",
            "--limit",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.dialect, Some(Backend::Postgres));
        assert_eq!(cli.limit, Some(20));
        match cli.command {
            Commands::Render {
                subject,
                connective,
                order_by,
                tokens,
                named,
                ..
            } => {
                assert_eq!(subject, "list");
                assert_eq!(connective, Connective::Or);
                assert_eq!(order_by, vec![Sort::desc("age")]);
                assert_eq!(tokens, vec![("join".to_string(), "LEFT JOIN b".to_string())]);
                assert!(!named);
            }
            Commands::Inspect { .. } => panic!("expected render"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_dialect() {
        let result = Cli::try_parse_from([
            "sqlcomposer",
            "inspect",
            "--doc",
            "doc.json",
            "--dialect",
            "oracle",
        ]);
        assert!(result.is_err());
    }
}
