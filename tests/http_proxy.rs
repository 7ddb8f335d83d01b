// tests/http_proxy.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use mailmerge::channel::ProgressChannel;
use mailmerge::engine::{ProgressEvent, RunOptions, RunSettings, RunState};
use mailmerge::errors::MergeError;
use mailmerge::proxy::{CallbackClient, HttpProxy, RunProxy};
use mailmerge::server::{self, FrontlineState, WorkerState};
use mailmerge::types::ConnectionToken;
use mailmerge_test_utils::builders::{TemplateBuilder, contacts_source, memory_worker};
use mailmerge_test_utils::fake_dispatcher::RecordingDispatcher;
use mailmerge_test_utils::{init_tracing, with_timeout};

async fn spawn_router(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Front-line and worker servers wired to each other over loopback.
async fn start_pair(dispatcher: RecordingDispatcher) -> (Arc<HttpProxy>, String) {
    // Bind the front-line first so the worker knows where to call back.
    let frontline_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let frontline_url = format!("http://{}", frontline_listener.local_addr().unwrap());

    let worker = Arc::new(memory_worker(
        vec![TemplateBuilder::new("welcome", "contacts")
            .subject("Hi <<First>>")
            .build()],
        vec![contacts_source("contacts", &["a@example.com", "b@example.com"])],
        Arc::new(dispatcher),
        RunSettings::default(),
    ));
    let worker_url = spawn_router(server::worker_router(WorkerState {
        worker,
        callbacks: Some(CallbackClient::new(frontline_url.clone()).unwrap()),
    }))
    .await;

    let proxy = Arc::new(HttpProxy::new(worker_url, ProgressChannel::new()).unwrap());
    let router = server::frontline_router(FrontlineState {
        proxy: proxy.clone(),
    });
    tokio::spawn(async move {
        axum::serve(frontline_listener, router).await.unwrap();
    });

    (proxy, frontline_url)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn progress_flows_back_through_callbacks() {
    init_tracing();
    let dispatcher = RecordingDispatcher::new().with_delay(Duration::from_millis(20));
    let (proxy, _frontline) = start_pair(dispatcher.clone()).await;

    let token = ConnectionToken::from("tab-1");
    let mut rx = proxy.channel().subscribe(token.clone());

    let run_id = with_timeout(proxy.start(RunOptions::new("welcome").with_token(token)))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = with_timeout(rx.recv()).await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.progress().run_id == run_id));
    assert!(matches!(events[0], ProgressEvent::Updated(ref p) if p.completed == 1));
    assert!(matches!(events[1], ProgressEvent::Updated(ref p) if p.completed == 2));
    match &events[2] {
        ProgressEvent::Completed(p) => assert_eq!(p.state, RunState::Completed),
        other => panic!("expected completed event, got {other:?}"),
    }
    assert_eq!(dispatcher.sent_rows(), vec![0, 1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_errors_map_back_to_typed_errors() {
    init_tracing();
    let (proxy, _frontline) = start_pair(RecordingDispatcher::new()).await;

    let err = proxy.start(RunOptions::new("nope")).await.unwrap_err();
    assert!(matches!(err, MergeError::TemplateNotFound(ref id) if id == "nope"), "got {err:?}");

    // Validated locally; never reaches the worker.
    let err = proxy.start(RunOptions::new("")).await.unwrap_err();
    assert!(matches!(err, MergeError::InvalidOptions(_)), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn frontline_start_endpoint_answers_202_and_404() {
    init_tracing();
    let (_proxy, frontline) = start_pair(RecordingDispatcher::new()).await;
    let client = reqwest::Client::new();

    let accepted = client
        .post(format!("{frontline}/api/mailmerge/start"))
        .json(&serde_json::json!({ "mergeTemplateId": "welcome", "connectionToken": "tab-2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), reqwest::StatusCode::ACCEPTED);
    let body: serde_json::Value = accepted.json().await.unwrap();
    assert!(body["runId"].as_str().is_some_and(|id| !id.is_empty()));

    let missing = client
        .post(format!("{frontline}/api/mailmerge/start"))
        .json(&serde_json::json!({ "mergeTemplateId": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let invalid = client
        .post(format!("{frontline}/api/mailmerge/start"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);
}

struct Unserializable;

impl serde::Serialize for Unserializable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("not representable"))
    }
}

#[test]
fn sse_frames_skip_payloads_that_fail_to_serialize() {
    let run_id = mailmerge::types::RunId::from("run-1");
    assert!(server::sse_event("updated", &run_id).is_some());
    assert!(server::sse_event("updated", &Unserializable).is_none());
}
