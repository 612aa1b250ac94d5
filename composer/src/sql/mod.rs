//! SQL abstraction layer for multi-database support
//!
//! Dialects supply positional placeholder and LIMIT syntax; the binder turns
//! a composed query with `:name` markers into driver-ready SQL.

mod bind;
mod dialect;
mod duckdb_dialect;
mod mysql_dialect;
mod postgres_dialect;
mod sqlite_dialect;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use bind::{BindError, BoundQuery, bind_named};
pub use dialect::SqlDialect;
pub use duckdb_dialect::DuckdbDialect;
pub use mysql_dialect::MysqlDialect;
pub use postgres_dialect::PostgresDialect;
pub use sqlite_dialect::SqliteDialect;

/// Database backend identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Mysql,
    Postgres,
    Duckdb,
}

impl Backend {
    /// Get the SQL dialect for this backend
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Backend::Sqlite => &SqliteDialect,
            Backend::Mysql => &MysqlDialect,
            Backend::Postgres => &PostgresDialect,
            Backend::Duckdb => &DuckdbDialect,
        }
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Duckdb => "duckdb",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "mysql" => Ok(Backend::Mysql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "duckdb" => Ok(Backend::Duckdb),
            other => Err(format!(
                "unknown dialect '{}', expected sqlite, mysql, postgres or duckdb",
                other
            )),
        }
    }
}
