// src/lib.rs

pub mod channel;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod merge;
pub mod proxy;
pub mod schedule;
pub mod server;
pub mod sheet;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::channel::ProgressChannel;
use crate::cli::{CliArgs, Command};
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::dispatch::LogDispatcher;
use crate::engine::{MergeWorker, ProgressEvent, RunOptions, RunState};
use crate::proxy::{CallbackClient, HttpProxy, InProcessProxy, RunProxy};
use crate::schedule::{EventKind, TriggerRegistry, spawn_clock_trigger};
use crate::server::{FrontlineState, WorkerState};
use crate::sheet::{CsvSourceResolver, SheetAccessor, SourceResolver, column_to_letter};
use crate::types::{CancelSignal, ConnectionToken, parse_duration};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    debug!(templates = cfg.template.len(), sources = cfg.source.len(), "config loaded");

    match args.command {
        Command::Run { template, dry_run } => run_once(&cfg, template, dry_run).await,
        Command::Worker { listen } => serve_worker(&cfg, listen).await,
        Command::Serve { listen } => serve_frontline(&cfg, listen).await,
        Command::Schedule => run_schedule(&cfg).await,
        Command::CheckSchedule { document } => check_schedule(&cfg, document),
        Command::Headers { source } => print_headers(&cfg, &source),
    }
}

/// Run one template in-process and print every progress event.
async fn run_once(cfg: &ConfigFile, template: String, dry_run: bool) -> Result<()> {
    let mut worker = MergeWorker::from_config(cfg)?;
    if dry_run {
        worker = worker.with_dispatcher(Arc::new(LogDispatcher::echo()));
    }

    let channel = ProgressChannel::new();
    let proxy = InProcessProxy::new(Arc::new(worker), channel.clone());

    let token = ConnectionToken::new(format!("cli-{}", std::process::id()));
    let mut events = channel.subscribe(token.clone());

    // Ctrl-C stops the run at the next row boundary.
    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let options = RunOptions::new(template)
        .with_token(token)
        .with_cancel(cancel);
    let (run_id, handle) = proxy.launch(options)?;
    info!(run_id = %run_id, dry_run, "merge run started");

    while let Some(event) = events.recv().await {
        let p = event.progress();
        match &event {
            ProgressEvent::Updated(_) => {
                println!("[{}] {}/{} sent, {} failed", p.run_id, p.completed, p.total, p.failed);
            }
            ProgressEvent::Completed(_) => {
                println!(
                    "[{}] {:?}: {}/{} rows, {} failed",
                    p.run_id, p.state, p.completed, p.total, p.failed
                );
            }
        }
        if let Some(err) = &p.last_error {
            match err.row_index {
                Some(row) => println!("    last error (row {row}): {}", err.message),
                None => println!("    last error: {}", err.message),
            }
        }
        if event.is_terminal() {
            break;
        }
    }

    let progress = handle.await.context("merge run task panicked")??;
    if progress.state == RunState::Failed {
        bail!("merge run {} failed", progress.run_id);
    }
    Ok(())
}

async fn serve_worker(cfg: &ConfigFile, listen: Option<String>) -> Result<()> {
    let worker = Arc::new(MergeWorker::from_config(cfg)?);
    let callbacks = match &cfg.config.frontline_url {
        Some(url) => Some(CallbackClient::new(url.clone())?),
        None => {
            warn!("no [config].frontline_url; progress from this worker is discarded");
            None
        }
    };

    let addr = match listen {
        Some(addr) => addr,
        None => worker_listen_addr(cfg)?,
    };

    let router = server::worker_router(WorkerState { worker, callbacks });
    server::serve(&addr, router).await?;
    Ok(())
}

/// Host and port of `[config].worker_url`.
fn worker_listen_addr(cfg: &ConfigFile) -> Result<String> {
    let Some(url) = &cfg.config.worker_url else {
        bail!("worker needs --listen or [config].worker_url");
    };
    let parsed = reqwest::Url::parse(url).with_context(|| format!("invalid worker_url '{url}'"))?;
    let host = parsed.host_str().unwrap_or("127.0.0.1");
    let port = parsed
        .port_or_known_default()
        .with_context(|| format!("worker_url '{url}' has no port"))?;
    Ok(format!("{host}:{port}"))
}

async fn serve_frontline(cfg: &ConfigFile, listen: Option<String>) -> Result<()> {
    let channel = ProgressChannel::new();
    let proxy: Arc<dyn RunProxy> = match &cfg.config.worker_url {
        Some(url) => {
            info!(worker = %url, "handing merge runs to remote worker");
            Arc::new(HttpProxy::new(url.clone(), channel)?)
        }
        None => {
            info!("no [config].worker_url; running merges in this process");
            let worker = Arc::new(MergeWorker::from_config(cfg)?);
            Arc::new(InProcessProxy::new(worker, channel))
        }
    };

    let addr = listen.unwrap_or_else(|| cfg.config.listen.clone());
    let router = server::frontline_router(FrontlineState { proxy });
    server::serve(&addr, router).await?;
    Ok(())
}

/// Validate every document's triggers, then run the clock triggers until
/// Ctrl-C.
async fn run_schedule(cfg: &ConfigFile) -> Result<()> {
    let registry = TriggerRegistry::from_triggers(cfg.trigger.iter().cloned());
    for document in registry.documents() {
        if !registry.validate_document(&document) {
            warn!(document = %document, "trigger binding is not valid; clock triggers still run");
        }
    }

    let worker = Arc::new(MergeWorker::from_config(cfg)?);
    let proxy: Arc<dyn RunProxy> = Arc::new(InProcessProxy::new(worker, ProgressChannel::new()));

    let mut handles = Vec::new();
    for trigger in &cfg.trigger {
        let (Some(template), Some(every)) = (&trigger.template, &trigger.every) else {
            debug!(document = %trigger.document, "trigger has no template or period; skipping");
            continue;
        };
        if trigger.event_kind != EventKind::Clock {
            debug!(document = %trigger.document, kind = ?trigger.event_kind, "not a clock trigger; skipping");
            continue;
        }
        let period = parse_duration(every).map_err(anyhow::Error::msg)?;
        info!(document = %trigger.document, template = %template, ?period, "clock trigger armed");
        handles.push(spawn_clock_trigger(
            Arc::clone(&proxy),
            template.clone(),
            None,
            period,
        ));
    }

    if handles.is_empty() {
        bail!("no clock triggers with a template and `every` period are configured");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutting down clock triggers");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

fn check_schedule(cfg: &ConfigFile, document: Option<String>) -> Result<()> {
    let registry = TriggerRegistry::from_triggers(cfg.trigger.iter().cloned());
    let documents = match document {
        Some(document) => vec![document],
        None => registry.documents(),
    };
    if documents.is_empty() {
        bail!("no triggers are bound to any document");
    }

    let mut invalid = 0;
    for document in &documents {
        let valid = registry.validate_document(document);
        println!("{document}: {}", if valid { "ok" } else { "invalid" });
        if !valid {
            invalid += 1;
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} document(s) have an invalid schedule", documents.len());
    }
    Ok(())
}

fn print_headers(cfg: &ConfigFile, source_id: &str) -> Result<()> {
    let resolver = CsvSourceResolver::new(cfg.source_paths());
    let source = resolver.open(source_id)?;
    let accessor = SheetAccessor::new(cfg.config.header_row);

    for (i, name) in accessor.header_row(source.as_ref())?.iter().enumerate() {
        println!("{}: {}", column_to_letter(i + 1), name);
    }
    Ok(())
}
