// src/merge/tags.rs

//! `<<Header>>` tag substitution.
//!
//! Tags are matched non-greedily, so `"<<A>><<B>>"` is two tags. Lookup is
//! case-sensitive and exact. A tag with no matching key renders as nothing.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<(.*?)>>").expect("tag pattern is a valid regex")
});

/// Replace every tag in `template` with the matching value from `row`.
pub fn render<V: Display>(template: &str, row: &HashMap<String, V>) -> String {
    TAG_PATTERN
        .replace_all(template, |caps: &Captures<'_>| {
            row.get(&caps[1])
                .map(|value| value.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Names of all tags in `template`, in order of appearance, duplicates kept.
pub fn tag_names(template: &str) -> Vec<String> {
    TAG_PATTERN
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}
