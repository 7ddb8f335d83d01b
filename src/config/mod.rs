// src/config/mod.rs

//! Configuration loading and validation for mailmerge.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references and value ranges (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, DispatchKind, DispatchSection, RawConfigFile, SourceConfig,
    TemplateConfig,
};
pub use validate::validate_config;
