// src/lib.rs

pub mod app;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::app::App;
use crate::cli::{CliArgs, Command};
use crate::config::resolve_config;
use crate::dag::{TaskId, BUILD_TASK, CLEAN_TASK, CLEAR_CACHE_TASK};
use crate::engine::{RunResult, RunStatus, TriggerReason};
use crate::fs::RealFileSystem;
use crate::server::{DevServer, ReloadHandle};
use crate::watch::spawn_watcher;

/// High-level entry point used by `main.rs`.
///
/// Loads config, builds the task graph, runs the requested task and, for
/// `watch`, keeps the watcher and dev server running until Ctrl-C.
/// Configuration problems are errors; a failed task is `RunStatus::Failure`
/// after its errors have been written to stderr.
pub async fn run(args: CliArgs) -> Result<RunStatus> {
    let mut cfg = resolve_config(args.config.as_deref().map(Path::new))?;
    if let Some(mode) = args.mode {
        cfg = cfg.with_mode(mode);
    }
    let app = App::new(cfg, Arc::new(RealFileSystem))?;

    let command = args.command.clone().unwrap_or(Command::Watch {
        port: None,
        no_server: false,
    });

    let task = match &command {
        Command::Build | Command::Watch { .. } => BUILD_TASK,
        Command::Clean => CLEAN_TASK,
        Command::ClearCache => CLEAR_CACHE_TASK,
        Command::Run { task } => task.as_str(),
        Command::Tasks => {
            print_tasks(&app);
            return Ok(RunStatus::Success);
        }
    };

    // Unknown names abort here, before any transform runs.
    let id = app.graph().resolve(task)?;

    if args.dry_run {
        print_dry_run(&app, id);
        return Ok(RunStatus::Success);
    }

    let report = app.orchestrator().run_id(id, TriggerReason::Manual).await;
    if !report.result.is_success() {
        report_failure(&report.result);
        return Ok(RunStatus::Failure);
    }
    println!("assetpipe: '{}' finished ({} mode)", task, app.config().mode());

    if let Command::Watch { port, no_server } = command {
        watch(&app, port, no_server).await?;
    }

    Ok(RunStatus::Success)
}

async fn watch(app: &App, port: Option<u16>, no_server: bool) -> Result<()> {
    let reload = ReloadHandle::new();

    let server = if no_server {
        None
    } else {
        let dev = DevServer::new(Arc::clone(app.config()), reload.clone());
        let listener = dev.bind(port).await?;
        if let Ok(addr) = listener.local_addr() {
            println!("assetpipe: serving http://{addr}");
        }
        Some(tokio::spawn(dev.serve(listener)))
    };

    let dispatcher = app.watch_dispatcher(server.as_ref().map(|_| reload.clone()))?;
    let _watcher = spawn_watcher(dispatcher)?;

    match server {
        Some(server) => {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => signal.context("listening for Ctrl-C")?,
                joined = server => joined.context("dev server task panicked")??,
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("listening for Ctrl-C")?,
    }

    info!("shutting down");
    Ok(())
}

/// Write one stderr line per underlying failure.
pub fn report_failure(result: &RunResult) {
    for line in failure_lines(result) {
        eprintln!("{line}");
    }
}

/// The lines `report_failure` prints, one per leaf error.
pub fn failure_lines(result: &RunResult) -> Vec<String> {
    let Some(err) = &result.error else {
        return Vec::new();
    };
    err.leaf_errors()
        .into_iter()
        .map(|leaf| {
            let task = leaf.task().unwrap_or(&result.task_name);
            format!("assetpipe: task '{task}' failed: {leaf}")
        })
        .collect()
}

fn print_tasks(app: &App) {
    let graph = app.graph();
    println!("tasks ({}):", graph.len());
    for name in graph.names() {
        if let Ok(id) = graph.resolve(name) {
            let node = graph.node(id);
            let children: Vec<&str> = node
                .children()
                .iter()
                .map(|c| graph.node(*c).name.as_str())
                .collect();
            if children.is_empty() {
                println!("  {name:<12} {}", node.kind());
            } else {
                println!("  {name:<12} {} [{}]", node.kind(), children.join(", "));
            }
        }
    }
}

fn print_dry_run(app: &App, id: TaskId) {
    let cfg = app.config();
    println!("assetpipe dry-run");
    println!("  root = {}", cfg.root().display());
    println!("  mode = {}", cfg.mode());
    println!("  output_root = {}", cfg.output_root().display());
    if let Some(timeout) = cfg.task_timeout() {
        println!("  task_timeout = {timeout:?}");
    }
    println!();

    println!("paths:");
    for spec in cfg.paths().iter() {
        println!(
            "  {:<8} {} -> {} (watch {})",
            spec.category,
            spec.source_pattern,
            spec.dest_dir.display(),
            spec.watch_pattern
        );
    }
    println!();

    print!("{}", app.graph().describe(id));
    debug!("dry-run complete (no execution)");
}
