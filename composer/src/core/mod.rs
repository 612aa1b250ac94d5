//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;

pub use crate::app::ComposerApp;
pub use cli::{CliConfig, Commands};
pub use config::{ComposerConfig, SettingsFileConfig};
