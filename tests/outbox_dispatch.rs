// tests/outbox_dispatch.rs

use std::sync::Arc;

use tempfile::TempDir;

use mailmerge::dispatch::{DispatchError, MessageDispatcher, OutboxDispatcher, OutgoingMessage};
use mailmerge::engine::{MergeWorker, RunOptions, RunState};
use mailmerge::merge::RenderedMessage;
use mailmerge::types::RunId;
use mailmerge_test_utils::builders::{ConfigFileBuilder, TemplateBuilder, template_config};
use mailmerge_test_utils::init_tracing;
use mailmerge_test_utils::sink::CollectingSink;

fn message(row_index: usize, to: &str) -> OutgoingMessage {
    let template = TemplateBuilder::new("welcome", "contacts")
        .title("Welcome")
        .timestamp_column("Sent", true)
        .build();
    OutgoingMessage::new(
        RunId::from("run-1"),
        &template,
        row_index,
        RenderedMessage {
            to: to.to_string(),
            cc: None,
            bcc: None,
            subject: "Hi".to_string(),
            body: "Body".to_string(),
        },
    )
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn appends_one_json_line_per_message() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("outbox.jsonl");
    let outbox = OutboxDispatcher::new(&path);

    outbox.send(&message(0, "a@example.com")).await.unwrap();
    outbox.send(&message(1, "b@example.com")).await.unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["to"], "a@example.com");
    assert_eq!(lines[1]["row_index"], 1);
    assert_eq!(lines[0]["logged_column"], "Welcome Sent");
    assert_eq!(lines[0]["run_id"], "run-1");
    assert!(lines[0]["sent_at"].as_str().is_some());
    assert!(lines[0].get("cc").is_none());
    assert_ne!(lines[0]["idempotency_key"], lines[1]["idempotency_key"]);
}

#[tokio::test]
async fn unwritable_outbox_is_run_fatal() {
    let dir = TempDir::new().unwrap();
    let outbox = OutboxDispatcher::new(dir.path().join("missing-dir").join("outbox.jsonl"));

    let err = outbox.send(&message(0, "a@example.com")).await.unwrap_err();
    assert!(matches!(err, DispatchError::Unavailable(_)), "got {err:?}");
    assert!(err.is_run_fatal());
    assert!(!DispatchError::Rejected("x".into()).is_run_fatal());
}

#[tokio::test]
async fn worker_from_config_merges_csv_into_outbox() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("contacts.csv"),
        "Email,First\nada@example.com,Ada\n,Nobody\nalan@example.com,Alan\n",
    )
    .unwrap();

    let mut welcome = template_config("contacts", "<<Email>>");
    welcome.subject = "Hi <<First>>".to_string();
    let cfg = ConfigFileBuilder::new()
        .with_source("contacts", "contacts.csv")
        .with_template("welcome", welcome)
        .with_outbox("out/outbox.jsonl")
        .with_root(dir.path())
        .build();
    std::fs::create_dir(dir.path().join("out")).unwrap();

    let worker = MergeWorker::from_config(&cfg).unwrap();
    let prepared = worker
        .prepare(RunId::generate(), RunOptions::new("welcome"))
        .unwrap();
    let sink = CollectingSink::new();
    let progress = worker.execute(prepared, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(progress.state, RunState::Completed);
    assert_eq!((progress.total, progress.completed, progress.failed), (3, 3, 1));

    let lines = read_lines(&dir.path().join("out/outbox.jsonl"));
    let subjects: Vec<&str> = lines.iter().map(|l| l["subject"].as_str().unwrap()).collect();
    assert_eq!(subjects, vec!["Hi Ada", "Hi Alan"]);
    assert_eq!(sink.terminals().len(), 1);
}

#[tokio::test]
async fn worker_prepare_rejects_before_any_run_exists() {
    let dir = TempDir::new().unwrap();
    let cfg = ConfigFileBuilder::new()
        .with_source("contacts", "absent.csv")
        .with_template("welcome", template_config("contacts", "<<Email>>"))
        .with_root(dir.path())
        .build();
    let worker = MergeWorker::from_config(&cfg).unwrap();

    assert!(worker
        .prepare(RunId::generate(), RunOptions::new("welcome"))
        .unwrap_err()
        .is_not_found());
    assert!(worker
        .prepare(RunId::generate(), RunOptions::new("other"))
        .unwrap_err()
        .is_not_found());
}
