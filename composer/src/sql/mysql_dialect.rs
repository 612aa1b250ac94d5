//! MySQL SQL dialect implementation

use super::SqlDialect;

/// MySQL SQL dialect
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn limit_offset(&self, limit: u64, offset: u64) -> String {
        format!("LIMIT {}, {}", offset, limit)
    }
}
