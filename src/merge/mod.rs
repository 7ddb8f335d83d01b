// src/merge/mod.rs

//! Merge templates and rendering.
//!
//! Templates are defined outside the pipeline (config, or any
//! [`TemplateRepository`]) and are read-only here.

use serde::{Deserialize, Serialize};

use crate::sheet::RowData;
use crate::types::TemplateId;

pub mod repository;
pub mod tags;

pub use repository::{StaticTemplates, TemplateRepository};
pub use tags::{render, tag_names};

/// One merge template definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeTemplate {
    pub id: TemplateId,
    pub title: String,
    /// Id of the tabular source this template merges against.
    pub source: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    /// Column that records when a row's message was sent.
    pub timestamp_column: Option<String>,
    /// Prefix the timestamp column name with the template title.
    pub prefix_title: bool,
}

/// A template rendered against one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

impl MergeTemplate {
    /// Name of the column a send time is logged under, if any.
    pub fn logged_column_name(&self) -> Option<String> {
        let column = self.timestamp_column.as_deref()?.trim();
        if column.is_empty() {
            return None;
        }
        if self.prefix_title && !self.title.trim().is_empty() {
            Some(format!("{} {}", self.title.trim(), column))
        } else {
            Some(column.to_string())
        }
    }

    /// Render every tagged field against `row`.
    ///
    /// Rendered cc/bcc that come out blank are dropped.
    pub fn render_row(&self, row: &RowData) -> RenderedMessage {
        let optional = |field: &Option<String>| {
            field
                .as_deref()
                .map(|t| render(t, row).trim().to_string())
                .filter(|s| !s.is_empty())
        };

        RenderedMessage {
            to: render(&self.to, row).trim().to_string(),
            cc: optional(&self.cc),
            bcc: optional(&self.bcc),
            subject: render(&self.subject, row),
            body: render(&self.body, row),
        }
    }

    /// Tag names used by any field, without duplicates, in first-seen order.
    pub fn referenced_tags(&self) -> Vec<String> {
        let fields = [
            Some(self.to.as_str()),
            self.cc.as_deref(),
            self.bcc.as_deref(),
            Some(self.subject.as_str()),
            Some(self.body.as_str()),
        ];

        let mut seen = Vec::new();
        for tag in fields.into_iter().flatten().flat_map(tag_names) {
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        seen
    }
}
