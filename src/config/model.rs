// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::merge::MergeTemplate;
use crate::schedule::Trigger;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// header_row = 1
/// dispatch_timeout = "30s"
///
/// [dispatch]
/// kind = "outbox"
/// outbox_path = "outbox.jsonl"
///
/// [source.contacts]
/// path = "contacts.csv"
///
/// [template.welcome]
/// title = "Welcome"
/// source = "contacts"
/// to = "<<Email>>"
/// subject = "Hi <<First>>"
/// body = "Dear <<First>> <<Last>>"
///
/// [[trigger]]
/// document = "contacts"
/// event = "clock"
/// handler = "run_merge"
/// template = "welcome"
/// every = "1h"
/// ```
///
/// This is the unvalidated form; use [`ConfigFile`] (via `TryFrom`) in the
/// rest of the application.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    /// Tabular sources from `[source.<id>]`.
    #[serde(default)]
    pub source: BTreeMap<String, SourceConfig>,

    /// Merge templates from `[template.<id>]`.
    #[serde(default)]
    pub template: BTreeMap<String, TemplateConfig>,

    /// Recurring triggers from `[[trigger]]`.
    #[serde(default)]
    pub trigger: Vec<Trigger>,
}

/// Validated configuration.
///
/// Can only be built through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders of a `ConfigFile` can rely on its invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub dispatch: DispatchSection,
    pub source: BTreeMap<String, SourceConfig>,
    pub template: BTreeMap<String, TemplateConfig>,
    pub trigger: Vec<Trigger>,
    /// Directory relative paths in the file are resolved against.
    pub root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            dispatch: raw.dispatch,
            source: raw.source,
            template: raw.template,
            trigger: raw.trigger,
            root: PathBuf::from("."),
        }
    }

    /// Set the directory used to resolve relative source/outbox paths.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute-ish paths for every declared source.
    pub fn source_paths(&self) -> BTreeMap<String, PathBuf> {
        self.source
            .iter()
            .map(|(id, s)| (id.clone(), self.resolve_path(&s.path)))
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// 1-based row holding the column headers.
    #[serde(default = "default_header_row")]
    pub header_row: usize,

    /// Upper bound for a single dispatch call, e.g. `"30s"`.
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout: String,

    /// Address the front-line server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Base URL of the worker (networked proxy target).
    #[serde(default)]
    pub worker_url: Option<String>,

    /// Base URL the worker posts progress callbacks to.
    #[serde(default)]
    pub frontline_url: Option<String>,
}

fn default_header_row() -> usize {
    1
}

fn default_dispatch_timeout() -> String {
    "30s".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            header_row: default_header_row(),
            dispatch_timeout: default_dispatch_timeout(),
            listen: default_listen(),
            worker_url: None,
            frontline_url: None,
        }
    }
}

/// Which dispatcher delivers rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    /// Log each message and report success.
    #[default]
    Log,
    /// Append each message as a JSON line to `outbox_path`.
    Outbox,
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    #[serde(default)]
    pub kind: DispatchKind,

    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("outbox.jsonl")
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            kind: DispatchKind::default(),
            outbox_path: default_outbox_path(),
        }
    }
}

/// `[source.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// CSV file path, relative to the config file's directory.
    pub path: PathBuf,
}

/// `[template.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub title: String,

    /// Key of a `[source.<id>]` section.
    pub source: String,

    pub to: String,

    #[serde(default)]
    pub cc: Option<String>,

    #[serde(default)]
    pub bcc: Option<String>,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub timestamp_column: Option<String>,

    #[serde(default)]
    pub prefix_title: bool,
}

impl TemplateConfig {
    pub fn to_template(&self, id: &str) -> MergeTemplate {
        MergeTemplate {
            id: id.to_string(),
            title: self.title.clone(),
            source: self.source.clone(),
            to: self.to.clone(),
            cc: self.cc.clone(),
            bcc: self.bcc.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            timestamp_column: self.timestamp_column.clone(),
            prefix_title: self.prefix_title,
        }
    }
}
