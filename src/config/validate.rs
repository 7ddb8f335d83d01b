// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MergeError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MergeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Validate an already-built config again (e.g. after edits in tests).
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    let raw = RawConfigFile {
        config: cfg.config.clone(),
        dispatch: cfg.dispatch.clone(),
        source: cfg.source.clone(),
        template: cfg.template.clone(),
        trigger: cfg.trigger.clone(),
    };
    validate_raw_config(&raw)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_templates(cfg)?;
    validate_global_config(cfg)?;
    validate_templates(cfg)?;
    validate_triggers(cfg)?;
    Ok(())
}

fn ensure_has_templates(cfg: &RawConfigFile) -> Result<()> {
    if cfg.template.is_empty() {
        return Err(MergeError::ConfigError(
            "config must contain at least one [template.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.header_row == 0 {
        return Err(MergeError::ConfigError(
            "[config].header_row must be >= 1 (got 0)".to_string(),
        ));
    }

    parse_duration(&cfg.config.dispatch_timeout).map_err(|e| {
        MergeError::ConfigError(format!("[config].dispatch_timeout: {e}"))
    })?;

    Ok(())
}

fn validate_templates(cfg: &RawConfigFile) -> Result<()> {
    for (id, template) in cfg.template.iter() {
        if !cfg.source.contains_key(&template.source) {
            return Err(MergeError::ConfigError(format!(
                "template '{}' references unknown source '{}'",
                id, template.source
            )));
        }
        if template.to.trim().is_empty() {
            return Err(MergeError::ConfigError(format!(
                "template '{}' must set a non-empty `to`",
                id
            )));
        }
    }
    Ok(())
}

fn validate_triggers(cfg: &RawConfigFile) -> Result<()> {
    for (i, trigger) in cfg.trigger.iter().enumerate() {
        if let Some(template) = &trigger.template {
            if !cfg.template.contains_key(template) {
                return Err(MergeError::ConfigError(format!(
                    "trigger #{} references unknown template '{}'",
                    i, template
                )));
            }
        }
        if let Some(every) = &trigger.every {
            let period = parse_duration(every).map_err(|e| {
                MergeError::ConfigError(format!("trigger #{} `every`: {}", i, e))
            })?;
            if period.is_zero() {
                return Err(MergeError::ConfigError(format!(
                    "trigger #{} `every` must be greater than zero",
                    i
                )));
            }
        }
    }
    Ok(())
}
