use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::DEFAULT_MAX_TEMPLATE_PASSES;
use crate::sql::Backend;
use crate::template::SqlLimit;

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// `settings` block of a composition document
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFileConfig {
    pub dialect: Option<Backend>,
    pub max_template_passes: Option<usize>,
    pub limit: Option<SqlLimit>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SettingsFileConfig {
    /// Warn about unknown fields in the settings block
    fn warn_unknown_fields(&self) {
        if !self.extra.is_empty() {
            let keys_str: String = self
                .extra
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in settings (possible typos)"
            );
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

/// Settings a composer renders and binds with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComposerConfig {
    pub dialect: Backend,
    pub max_template_passes: usize,
    pub limit: SqlLimit,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            dialect: Backend::default(),
            max_template_passes: DEFAULT_MAX_TEMPLATE_PASSES,
            limit: SqlLimit::default(),
        }
    }
}

impl ComposerConfig {
    /// Defaults overlaid with a document's settings block. A pass limit of
    /// zero is ignored in favour of the default.
    pub fn from_settings(settings: Option<&SettingsFileConfig>) -> Self {
        let defaults = Self::default();
        let Some(settings) = settings else {
            return defaults;
        };
        settings.warn_unknown_fields();

        let max_template_passes = match settings.max_template_passes {
            Some(0) => {
                tracing::warn!(
                    default = defaults.max_template_passes,
                    "maxTemplatePasses must be at least 1, using default"
                );
                defaults.max_template_passes
            }
            Some(passes) => passes,
            None => defaults.max_template_passes,
        };

        Self {
            dialect: settings.dialect.unwrap_or(defaults.dialect),
            max_template_passes,
            limit: settings.limit.unwrap_or(defaults.limit),
        }
    }

    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Document `settings` block
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(settings: Option<&SettingsFileConfig>, cli: &CliConfig) -> anyhow::Result<Self> {
        tracing::trace!(cli = ?cli, "CLI config");

        let file = Self::from_settings(settings);
        let config = Self {
            dialect: cli.dialect.unwrap_or(file.dialect),
            max_template_passes: cli.max_passes.unwrap_or(file.max_template_passes),
            limit: SqlLimit {
                offset: cli.offset.unwrap_or(file.limit.offset),
                size: cli.limit.unwrap_or(file.limit.size),
            },
        };

        if config.max_template_passes == 0 {
            anyhow::bail!("Template pass limit must be at least 1");
        }

        tracing::debug!(
            dialect = %config.dialect,
            max_passes = config.max_template_passes,
            "Composer configuration loaded"
        );
        Ok(config)
    }
}
