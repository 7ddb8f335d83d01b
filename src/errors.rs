// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Row-level dispatch failures are *not* represented here; they live in
//! [`crate::dispatch::DispatchError`] and never leave the orchestrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Merge template not found: {0}")]
    TemplateNotFound(String),

    #[error("Tabular source not found: {0}")]
    SourceNotFound(String),

    #[error("Failed to read tabular source '{source_id}': {message}")]
    SourceRead { source_id: String, message: String },

    #[error("Invalid run options: {0}")]
    InvalidOptions(String),

    #[error("Message transport unusable: {0}")]
    TransportFatal(String),

    #[error("Run proxy error: {0}")]
    ProxyError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    /// True for the not-found conditions the control surface maps to 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MergeError::TemplateNotFound(_) | MergeError::SourceNotFound(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MergeError>;
