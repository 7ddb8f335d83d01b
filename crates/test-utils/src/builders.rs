#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use mailmerge::config::{
    ConfigFile, ConfigSection, DispatchKind, DispatchSection, RawConfigFile, SourceConfig,
    TemplateConfig,
};
use mailmerge::dispatch::MessageDispatcher;
use mailmerge::engine::{MergeWorker, RunSettings};
use mailmerge::merge::{MergeTemplate, StaticTemplates};
use mailmerge::schedule::Trigger;
use mailmerge::sheet::{MemorySource, MemorySourceResolver};

/// Builder for `MergeTemplate` to simplify test setup.
pub struct TemplateBuilder {
    template: MergeTemplate,
}

impl TemplateBuilder {
    /// Template `id` reading from `source`, addressed to `<<Email>>`.
    pub fn new(id: &str, source: &str) -> Self {
        Self {
            template: MergeTemplate {
                id: id.to_string(),
                title: String::new(),
                source: source.to_string(),
                to: "<<Email>>".to_string(),
                cc: None,
                bcc: None,
                subject: String::new(),
                body: String::new(),
                timestamp_column: None,
                prefix_title: false,
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.template.title = title.to_string();
        self
    }

    pub fn to(mut self, to: &str) -> Self {
        self.template.to = to.to_string();
        self
    }

    pub fn cc(mut self, cc: &str) -> Self {
        self.template.cc = Some(cc.to_string());
        self
    }

    pub fn bcc(mut self, bcc: &str) -> Self {
        self.template.bcc = Some(bcc.to_string());
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.template.subject = subject.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.template.body = body.to_string();
        self
    }

    pub fn timestamp_column(mut self, column: &str, prefix_title: bool) -> Self {
        self.template.timestamp_column = Some(column.to_string());
        self.template.prefix_title = prefix_title;
        self
    }

    pub fn build(self) -> MergeTemplate {
        self.template
    }
}

/// Builder for `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    root: Option<PathBuf>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                dispatch: DispatchSection::default(),
                source: BTreeMap::new(),
                template: BTreeMap::new(),
                trigger: Vec::new(),
            },
            root: None,
        }
    }

    pub fn with_source(mut self, id: &str, path: &str) -> Self {
        self.config.source.insert(
            id.to_string(),
            SourceConfig {
                path: PathBuf::from(path),
            },
        );
        self
    }

    pub fn with_template(mut self, id: &str, template: TemplateConfig) -> Self {
        self.config.template.insert(id.to_string(), template);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.config.trigger.push(trigger);
        self
    }

    pub fn with_header_row(mut self, row: usize) -> Self {
        self.config.config.header_row = row;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: &str) -> Self {
        self.config.config.dispatch_timeout = timeout.to_string();
        self
    }

    /// Dispatch through an outbox file instead of the log.
    pub fn with_outbox(mut self, path: &str) -> Self {
        self.config.dispatch.kind = DispatchKind::Outbox;
        self.config.dispatch.outbox_path = PathBuf::from(path);
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> mailmerge::errors::Result<ConfigFile> {
        let root = self.root;
        let cfg = ConfigFile::try_from(self.config)?;
        Ok(match root {
            Some(root) => cfg.with_root(root),
            None => cfg,
        })
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `[template.<id>]` entry with the given source and `to`.
pub fn template_config(source: &str, to: &str) -> TemplateConfig {
    TemplateConfig {
        title: String::new(),
        source: source.to_string(),
        to: to.to_string(),
        cc: None,
        bcc: None,
        subject: String::new(),
        body: String::new(),
        timestamp_column: None,
        prefix_title: false,
    }
}

/// Source with an `Email,First` header and one data row per address.
pub fn contacts_source(id: &str, emails: &[&str]) -> MemorySource {
    let mut rows = vec![vec!["Email".to_string(), "First".to_string()]];
    for (i, email) in emails.iter().enumerate() {
        rows.push(vec![email.to_string(), format!("Person{i}")]);
    }
    MemorySource::from_rows(id, rows)
}

/// Worker over in-memory templates and sources.
pub fn memory_worker(
    templates: Vec<MergeTemplate>,
    sources: Vec<MemorySource>,
    dispatcher: Arc<dyn MessageDispatcher>,
    settings: RunSettings,
) -> MergeWorker {
    let repo = templates
        .into_iter()
        .fold(StaticTemplates::new(), StaticTemplates::with_template);
    let resolver = sources
        .into_iter()
        .fold(MemorySourceResolver::new(), MemorySourceResolver::with_source);
    MergeWorker::new(Arc::new(repo), Arc::new(resolver), dispatcher, settings)
}
