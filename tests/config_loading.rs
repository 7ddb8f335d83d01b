// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};

use mailmerge::config::{DispatchKind, load_and_validate, validate_config};
use mailmerge::engine::RunSettings;
use mailmerge::errors::MergeError;
use mailmerge::merge::{StaticTemplates, TemplateRepository};
use mailmerge::types::parse_duration;
use mailmerge_test_utils::builders::{ConfigFileBuilder, template_config};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = write_config(contents);
    match load_and_validate(file.path()) {
        Err(MergeError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_loads_with_defaults_and_relative_paths() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Mailmerge.toml");
    std::fs::write(
        &path,
        r#"
[config]
dispatch_timeout = "250ms"

[dispatch]
kind = "outbox"

[source.contacts]
path = "data/contacts.csv"

[template.welcome]
title = "Welcome"
source = "contacts"
to = "<<Email>>"
cc = "<<Manager>>"
subject = "Hi <<First>>"
body = "Dear <<First>>"
timestamp_column = "Sent"
prefix_title = true

[[trigger]]
document = "contacts"
event = "clock"
handler = "run_merge"
template = "welcome"
every = "1h"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.header_row, 1);
    assert_eq!(cfg.dispatch.kind, DispatchKind::Outbox);
    assert_eq!(
        cfg.source_paths()["contacts"],
        dir.path().join("data/contacts.csv")
    );
    assert_eq!(
        cfg.resolve_path(&cfg.dispatch.outbox_path),
        dir.path().join("outbox.jsonl")
    );

    let settings = RunSettings::from_config(&cfg).unwrap();
    assert_eq!(settings.dispatch_timeout, Duration::from_millis(250));

    let template = StaticTemplates::from_config(&cfg).get("welcome").unwrap();
    assert_eq!(template.cc.as_deref(), Some("<<Manager>>"));
    assert_eq!(template.logged_column_name().as_deref(), Some("Welcome Sent"));
    assert_eq!(cfg.trigger.len(), 1);
}

#[test]
fn config_without_templates_is_rejected() {
    expect_config_error("[source.contacts]\npath = \"c.csv\"\n", "at least one");
}

#[test]
fn template_with_unknown_source_is_rejected() {
    expect_config_error(
        r#"
[template.welcome]
source = "nowhere"
to = "<<Email>>"
"#,
        "unknown source",
    );
}

#[test]
fn blank_recipient_template_is_rejected() {
    expect_config_error(
        r#"
[source.contacts]
path = "c.csv"

[template.welcome]
source = "contacts"
to = "  "
"#,
        "non-empty `to`",
    );
}

#[test]
fn header_row_zero_is_rejected() {
    expect_config_error(
        r#"
[config]
header_row = 0

[source.contacts]
path = "c.csv"

[template.welcome]
source = "contacts"
to = "<<Email>>"
"#,
        "header_row",
    );
}

#[test]
fn bad_durations_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_source("contacts", "c.csv")
        .with_template("welcome", template_config("contacts", "<<Email>>"))
        .with_dispatch_timeout("soon")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MergeError::ConfigError(ref m) if m.contains("dispatch_timeout")));

    let err = ConfigFileBuilder::new()
        .with_source("contacts", "c.csv")
        .with_template("welcome", template_config("contacts", "<<Email>>"))
        .with_dispatch_timeout("9999999999999999999h")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, MergeError::ConfigError(ref m) if m.contains("overflows")));

    expect_config_error(
        r#"
[source.contacts]
path = "c.csv"

[template.welcome]
source = "contacts"
to = "<<Email>>"

[[trigger]]
document = "contacts"
event = "clock"
handler = "run_merge"
template = "welcome"
every = "0s"
"#,
        "greater than zero",
    );
}

#[test]
fn duration_syntax() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 30 s "), Ok(Duration::from_secs(30)));
    assert_eq!(parse_duration("5M"), Ok(Duration::from_secs(300)));
    assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("15").is_err());
    assert!(parse_duration("3d").is_err());
    assert!(parse_duration("18446744073709551615s").unwrap_err().contains("overflows"));
}

#[test]
fn trigger_with_unknown_template_is_rejected() {
    expect_config_error(
        r#"
[source.contacts]
path = "c.csv"

[template.welcome]
source = "contacts"
to = "<<Email>>"

[[trigger]]
document = "contacts"
event = "clock"
handler = "run_merge"
template = "goodbye"
"#,
        "unknown template",
    );
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[template.welcome\nsource = 1");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(MergeError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/Mailmerge.toml"),
        Err(MergeError::IoError(_))
    ));
}

#[test]
fn edited_config_can_be_revalidated() {
    let mut cfg = ConfigFileBuilder::new()
        .with_source("contacts", "c.csv")
        .with_template("welcome", template_config("contacts", "<<Email>>"))
        .build();
    assert!(validate_config(&cfg).is_ok());

    cfg.source.clear();
    let err = validate_config(&cfg).unwrap_err();
    assert!(matches!(err, MergeError::ConfigError(ref m) if m.contains("unknown source")));
}
