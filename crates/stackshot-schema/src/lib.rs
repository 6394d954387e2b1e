//! Stack document parsing, validation, and identifier types for stackshot.
//!
//! This crate defines the configuration layer: the `StackConfig` record the
//! reconciliation engine consumes, the YAML/TOML stack document loader that
//! produces it (`load_stack_file`, `parse_stack_yaml`, `parse_stack_toml`), and
//! string newtypes for remote-assigned identifiers (`StackId`, `EventId`).

pub mod config;
pub mod document;
pub mod types;

pub use config::{validate_stack_name, OnFailure, StackConfig, TemplateSource};
pub use document::{load_stack_file, parse_stack_toml, parse_stack_yaml, StackDocument};
pub use types::{EventId, StackId};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read stack document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("missing fields from document: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("only one of template_url, template_body, template_path may be set")]
    AmbiguousTemplate,
    #[error("disable_rollback and on_failure cannot both be set")]
    ConflictingFailurePolicy,
    #[error("invalid on_failure value '{0}', expected DO_NOTHING, ROLLBACK or DELETE")]
    InvalidOnFailure(String),
    /// Names follow the orchestration service's own limits, checked before
    /// anything is sent.
    #[error(
        "invalid stack name: {0} (the orchestration service requires a letter followed by \
         letters, digits or hyphens, at most 128 characters)"
    )]
    InvalidName(String),
    #[error("failed to read template '{}': {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },
}
