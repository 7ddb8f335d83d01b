// src/server/mod.rs

//! HTTP control surface.
//!
//! - [`worker_router`]: the worker process. Accepts start requests and runs
//!   merges on its own tasks, calling the front-line back per snapshot.
//! - [`frontline_router`]: the request-handling process. Starts runs through
//!   a [`RunProxy`], receives notify callbacks and streams progress to
//!   subscribers over SSE.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::engine::{DiscardSink, MergeWorker, ProgressEvent, ProgressSink};
use crate::errors::{MergeError, Result};
use crate::proxy::http::{NOTIFY_COMPLETED_PATH, NOTIFY_UPDATED_PATH, START_PATH};
use crate::proxy::{CallbackClient, NotifyRequest, RunProxy, StartRequest, StartResponse};
use crate::types::{ConnectionToken, RunId};

mod error;

pub use error::ApiError;

pub const PROGRESS_PATH: &str = "/api/mailmerge/progress/{token}";

#[derive(Clone)]
pub struct WorkerState {
    pub worker: Arc<MergeWorker>,
    /// Where to post progress; `None` discards it.
    pub callbacks: Option<CallbackClient>,
}

pub fn worker_router(state: WorkerState) -> Router {
    Router::new()
        .route(START_PATH, post(worker_start))
        .with_state(state)
}

async fn worker_start(
    State(state): State<WorkerState>,
    Json(request): Json<StartRequest>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let run_id = RunId::generate();
    let prepared = state.worker.prepare(run_id.clone(), request.into_options())?;

    let sink: Arc<dyn ProgressSink> = match (&state.callbacks, &prepared.connection_token) {
        (Some(callbacks), Some(_)) => Arc::new(callbacks.sink(
            run_id.clone(),
            prepared.connection_token.clone(),
        )),
        _ => Arc::new(DiscardSink),
    };

    let worker = Arc::clone(&state.worker);
    let task_run_id = run_id.clone();
    tokio::spawn(async move {
        if let Err(err) = worker.execute(prepared, sink).await {
            warn!(run_id = %task_run_id, error = %err, "merge run ended with an error");
        }
    });

    info!(run_id = %run_id, "merge run accepted");
    Ok((StatusCode::ACCEPTED, Json(StartResponse { run_id })))
}

#[derive(Clone)]
pub struct FrontlineState {
    pub proxy: Arc<dyn RunProxy>,
}

pub fn frontline_router(state: FrontlineState) -> Router {
    Router::new()
        .route(START_PATH, post(frontline_start))
        .route(NOTIFY_UPDATED_PATH, post(notify_updated))
        .route(NOTIFY_COMPLETED_PATH, post(notify_completed))
        .route(PROGRESS_PATH, get(progress_stream))
        .with_state(state)
}

async fn frontline_start(
    State(state): State<FrontlineState>,
    Json(request): Json<StartRequest>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let run_id = state.proxy.start(request.into_options()).await?;
    Ok((StatusCode::ACCEPTED, Json(StartResponse { run_id })))
}

async fn notify_updated(
    State(state): State<FrontlineState>,
    Json(request): Json<NotifyRequest>,
) -> StatusCode {
    state.proxy.notify_updated(
        &request.run_id,
        request.connection_token.as_ref(),
        request.progress,
    );
    StatusCode::NO_CONTENT
}

async fn notify_completed(
    State(state): State<FrontlineState>,
    Json(request): Json<NotifyRequest>,
) -> StatusCode {
    state.proxy.notify_completed(
        &request.run_id,
        request.connection_token.as_ref(),
        request.progress,
    );
    StatusCode::NO_CONTENT
}

/// GET /api/mailmerge/progress/{token}: SSE stream of `updated` and
/// `completed` events for the given connection token.
async fn progress_stream(
    Path(token): Path<String>,
    State(state): State<FrontlineState>,
) -> impl IntoResponse {
    let token = ConnectionToken::from(token);
    debug!(token = %token, "progress stream opened");
    let rx = state.proxy.channel().subscribe(token);

    let stream = UnboundedReceiverStream::new(rx).filter_map(|event| {
        let name = match &event {
            ProgressEvent::Updated(_) => "updated",
            ProgressEvent::Completed(_) => "completed",
        };
        sse_event(name, event.progress()).map(Ok::<Event, Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Build a named SSE frame with a JSON payload.
///
/// A payload that fails to serialize is logged and yields `None`, so the
/// stream skips it instead of sending an empty frame.
pub fn sse_event<T: Serialize>(name: &str, payload: &T) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, error = %err, "dropping progress event that failed to serialize");
            None
        }
    }
}

/// Bind `addr` and serve `router` until the process is stopped.
pub async fn serve(addr: &str, router: Router) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| MergeError::ConfigError(format!("invalid listen address '{addr}': {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
