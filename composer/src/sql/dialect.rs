//! SQL dialect trait for multi-database support
//!
//! Defines the driver-specific syntax the binder and the `%limit` token need.

/// SQL dialect trait for generating database-specific SQL
///
/// Dialects differ in:
/// - Parameter placeholders (? vs $1)
/// - Limit/offset clauses
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite/MySQL/DuckDB: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Generate LIMIT/OFFSET clause
    ///
    /// Most databases use `LIMIT x OFFSET y`, but syntax may vary.
    fn limit_offset(&self, limit: u64, offset: u64) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }
}
