// src/merge/repository.rs

use std::collections::BTreeMap;

use super::MergeTemplate;
use crate::config::ConfigFile;

/// Read-only lookup of merge templates.
///
/// Persistence (CRUD) lives elsewhere; the pipeline only resolves ids.
pub trait TemplateRepository: Send + Sync {
    fn get(&self, id: &str) -> Option<MergeTemplate>;
}

/// Fixed set of templates, typically built from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplates {
    templates: BTreeMap<String, MergeTemplate>,
}

impl StaticTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: MergeTemplate) -> Self {
        self.templates.insert(template.id.clone(), template);
        self
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let templates = cfg
            .template
            .iter()
            .map(|(id, t)| (id.clone(), t.to_template(id)))
            .collect();
        Self { templates }
    }
}

impl TemplateRepository for StaticTemplates {
    fn get(&self, id: &str) -> Option<MergeTemplate> {
        self.templates.get(id).cloned()
    }
}
