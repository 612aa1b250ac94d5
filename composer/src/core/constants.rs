// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (binary name and log target)
pub const APP_NAME: &str = "sqlcomposer";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SQLCOMPOSER_LOG";

/// Environment variable for the composition document path
pub const ENV_DOC: &str = "SQLCOMPOSER_DOC";

/// Environment variable for the SQL dialect used when binding
pub const ENV_DIALECT: &str = "SQLCOMPOSER_DIALECT";

/// Environment variable for the template expansion pass limit
pub const ENV_MAX_PASSES: &str = "SQLCOMPOSER_MAX_PASSES";

// =============================================================================
// Logging Defaults
// =============================================================================

/// Filter used when neither SQLCOMPOSER_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "warn,sqlcomposer=info";

// =============================================================================
// Composition Defaults
// =============================================================================

/// Default dialect name
pub const DEFAULT_DIALECT: &str = "sqlite";

/// Default row offset of the `%limit` token
pub const DEFAULT_LIMIT_OFFSET: u64 = 0;

/// Default page size of the `%limit` token
pub const DEFAULT_LIMIT_SIZE: u64 = 10;

/// Maximum number of rescans of a template before expansion is aborted
pub const DEFAULT_MAX_TEMPLATE_PASSES: usize = 16;

// =============================================================================
// Context Tokens
// =============================================================================

/// Token holding the current conditions, rendered as WHERE
pub const TOKEN_WHERE: &str = "where";

/// Token holding the current conditions, rendered as HAVING
pub const TOKEN_HAVING: &str = "having";

/// Token holding the page window
pub const TOKEN_LIMIT: &str = "limit";

/// Token holding the ordering, present only when one was set
pub const TOKEN_ORDER_BY: &str = "order_by";

/// Prefix of field group tokens (`%fields.base`)
pub const TOKEN_FIELDS_PREFIX: &str = "fields.";
