//! Composition document
//!
//! A JSON or YAML document declaring field groups, extra tokens, filter
//! pipelines, default conditions and the query templates ("subjects") of one
//! API.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::condition::{Filter, PipelineDefinition};
use crate::core::config::SettingsFileConfig;
use crate::error::ComposeError;
use crate::template::FieldGroup;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read composition document {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse composition document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to parse YAML composition document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid default conditions: {0}")]
    Conditions(#[source] ComposeError),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Named parameter handed to a token factory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenParam {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenDefinition {
    #[serde(default)]
    pub params: Vec<TokenParam>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldGroup>,
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenDefinition>,
    #[serde(default)]
    pub filter_pipelines: BTreeMap<String, PipelineDefinition>,
    #[serde(default)]
    pub default_conditions: Vec<Filter>,
    #[serde(default)]
    pub subject: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompositionDoc {
    #[serde(default)]
    pub info: DocInfo,
    pub composition: Composition,
    #[serde(default)]
    pub settings: Option<SettingsFileConfig>,
}

impl CompositionDoc {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_str(json)?;
        doc.log_parsed("json");
        Ok(doc)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_yaml::from_str(yaml)?;
        doc.log_parsed("yaml");
        Ok(doc)
    }

    /// Load a document from disk. Files ending in `.yaml` or `.yml` are read
    /// as YAML, everything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading composition document");
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    fn log_parsed(&self, format: &str) {
        tracing::debug!(
            format,
            name = %self.info.name,
            version = %self.info.version,
            subjects = self.composition.subject.len(),
            "Parsed composition document"
        );
    }

    pub fn subject(&self, key: &str) -> Option<&str> {
        self.composition.subject.get(key).map(String::as_str)
    }
}
