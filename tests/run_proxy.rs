// tests/run_proxy.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use mailmerge::channel::ProgressChannel;
use mailmerge::engine::{MergeWorker, ProgressEvent, RunOptions, RunSettings, RunState};
use mailmerge::errors::MergeError;
use mailmerge::proxy::{InProcessProxy, RunProxy};
use mailmerge::types::{ConnectionToken, RunId};
use mailmerge_test_utils::builders::{TemplateBuilder, contacts_source, memory_worker};
use mailmerge_test_utils::fake_dispatcher::RecordingDispatcher;
use mailmerge_test_utils::{init_tracing, with_timeout};

fn worker(dispatcher: RecordingDispatcher) -> Arc<MergeWorker> {
    Arc::new(memory_worker(
        vec![
            TemplateBuilder::new("welcome", "contacts")
                .subject("Hi <<First>>")
                .build(),
            TemplateBuilder::new("orphan", "missing-sheet").build(),
        ],
        vec![contacts_source(
            "contacts",
            &["a@example.com", "b@example.com", "c@example.com"],
        )],
        Arc::new(dispatcher),
        RunSettings::default(),
    ))
}

async fn collect_until_terminal(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

#[tokio::test]
async fn start_returns_before_the_run_finishes() {
    init_tracing();
    let dispatcher = RecordingDispatcher::new().with_delay(Duration::from_millis(100));
    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(worker(dispatcher.clone()), channel.clone());
    let token = ConnectionToken::from("tab-1");
    let mut rx = channel.subscribe(token.clone());

    let run_id = with_timeout(proxy.start(RunOptions::new("welcome").with_token(token)))
        .await
        .unwrap();

    // Nothing can have been delivered yet: every send takes 100ms.
    assert!(dispatcher.sent().is_empty());
    assert!(rx.try_recv().is_err());

    let events = with_timeout(collect_until_terminal(&mut rx)).await;
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.progress().run_id == run_id));

    let completed: Vec<usize> = events.iter().map(|e| e.progress().completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 3]);

    let last = events.last().unwrap();
    assert!(last.is_terminal());
    assert_eq!(last.progress().state, RunState::Completed);
    assert_eq!(dispatcher.sent_rows(), vec![0, 1, 2]);
}

#[tokio::test]
async fn validation_errors_are_returned_to_the_caller() {
    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(worker(RecordingDispatcher::new()), channel);

    let err = proxy.start(RunOptions::new("  ")).await.unwrap_err();
    assert!(matches!(err, MergeError::InvalidOptions(_)), "got {err:?}");

    let err = proxy.start(RunOptions::new("nope")).await.unwrap_err();
    assert!(matches!(err, MergeError::TemplateNotFound(ref id) if id == "nope"));

    let err = proxy.start(RunOptions::new("orphan")).await.unwrap_err();
    assert!(matches!(err, MergeError::SourceNotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn run_without_token_still_completes() {
    let dispatcher = RecordingDispatcher::new();
    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(worker(dispatcher.clone()), channel.clone());

    let (_run_id, handle) = proxy.launch(RunOptions::new("welcome")).unwrap();
    let progress = with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(progress.state, RunState::Completed);
    assert_eq!(dispatcher.sent_rows(), vec![0, 1, 2]);
    assert_eq!(channel.subscriber_count(), 0);
}

#[tokio::test]
async fn concurrent_runs_are_routed_by_token() {
    init_tracing();
    let dispatcher = RecordingDispatcher::new().with_delay(Duration::from_millis(5));
    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(worker(dispatcher.clone()), channel.clone());

    let mut rx_a = channel.subscribe(ConnectionToken::from("a"));
    let mut rx_b = channel.subscribe(ConnectionToken::from("b"));

    let run_a = proxy
        .start(RunOptions::new("welcome").with_token("a"))
        .await
        .unwrap();
    let run_b = proxy
        .start(RunOptions::new("welcome").with_token("b"))
        .await
        .unwrap();
    assert_ne!(run_a, run_b);

    let events_a = with_timeout(collect_until_terminal(&mut rx_a)).await;
    let events_b = with_timeout(collect_until_terminal(&mut rx_b)).await;

    assert!(events_a.iter().all(|e| e.progress().run_id == run_a));
    assert!(events_b.iter().all(|e| e.progress().run_id == run_b));
    assert_eq!(events_a.len(), 4);
    assert_eq!(events_b.len(), 4);
    assert_eq!(dispatcher.sent().len(), 6);
}

#[tokio::test]
async fn notify_calls_relay_into_the_channel() {
    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(worker(RecordingDispatcher::new()), channel.clone());
    let token = ConnectionToken::from("tab-9");
    let mut rx = channel.subscribe(token.clone());

    let run_id = RunId::from("remote-run");
    let progress = mailmerge::engine::RunTracker::new(run_id.clone(), "welcome".into()).snapshot();

    proxy.notify_updated(&run_id, Some(&token), progress.clone());
    proxy.notify_completed(&run_id, Some(&token), progress.clone());
    // No token: dropped without error.
    proxy.notify_updated(&run_id, None, progress.clone());

    assert_eq!(rx.recv().await, Some(ProgressEvent::Updated(progress.clone())));
    assert_eq!(rx.recv().await, Some(ProgressEvent::Completed(progress)));
    assert!(rx.try_recv().is_err());
}
