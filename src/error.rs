// src/error.rs
//
// Errors for the fallible edges: loading a config file and parsing tag selectors. The pipeline
// itself never fails.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// A preserve selector (`name` or `name.class`) that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty tag selector")]
    Empty,

    #[error("invalid tag name {0:?} in selector")]
    InvalidName(String),

    #[error("invalid class {0:?} in selector")]
    InvalidClass(String),
}
