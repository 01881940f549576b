// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod workload;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::Manifest;
use crate::dag::{GraphBuilder, TaskGraph};
use crate::engine::{Startup, StartupBuilder, TracingRunListener, TracingTaskListener, WaitOutcome};
use crate::exec::{Executor, TokioExecutor, WorkerPool, default_parallelism};
use crate::types::ExecutorKind;
use crate::workload::simulated_tasks;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and CLI overrides
/// - the worker executor (thread pool or Tokio blocking pool)
/// - the orchestrator, with tracing listeners attached
/// - the privileged thread, which is the caller's thread
pub fn run(args: CliArgs) -> Result<()> {
    let mut manifest = load_and_validate(&args.config)
        .with_context(|| format!("failed to load manifest '{}'", args.config))?;

    if let Some(policy) = args.policy {
        manifest.config.failure_policy = policy;
    }
    if let Some(ms) = args.timeout_ms {
        manifest.config.await_timeout_ms = ms;
    }

    if args.dry_run {
        print_dry_run(&manifest)?;
        return Ok(());
    }

    let workers = manifest.config.workers.unwrap_or_else(default_parallelism);

    match manifest.config.executor {
        ExecutorKind::Pool => {
            let pool = Arc::new(WorkerPool::new(workers)?);
            run_manifest(&manifest, pool)
        }
        ExecutorKind::Tokio => {
            // The runtime must outlive every submitted job, so it is owned
            // here until the run is over.
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(workers)
                .thread_name("bootdag-tokio")
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?;
            let executor = Arc::new(TokioExecutor::new(runtime.handle().clone()));
            run_manifest(&manifest, executor)
        }
    }
}

/// Build an orchestrator for every task of `manifest`, with simulated bodies
/// and tracing listeners.
pub fn build_startup(manifest: &Manifest, executor: Arc<dyn Executor>) -> errors::Result<Startup> {
    let mut builder = StartupBuilder::new()
        .executor(executor)
        .policy(manifest.config.failure_policy)
        .task_listener(Arc::new(TracingTaskListener))
        .run_listener(Arc::new(TracingRunListener));

    for spec in simulated_tasks(manifest) {
        builder = builder.add(spec)?;
    }
    builder.build()
}

/// Build and validate the task graph of `manifest` without an executor.
pub fn build_graph(manifest: &Manifest) -> errors::Result<TaskGraph> {
    let mut builder = GraphBuilder::new();
    for spec in simulated_tasks(manifest) {
        builder.add(spec)?;
    }
    builder.build()
}

fn run_manifest(manifest: &Manifest, executor: Arc<dyn Executor>) -> Result<()> {
    let startup = build_startup(manifest, executor)?;
    let timeout = manifest.config.await_timeout();
    let started = Instant::now();

    startup.start()?;
    let outcome = startup.wait(timeout)?;
    let waited = started.elapsed();

    match outcome {
        WaitOutcome::Completed => {
            info!(elapsed_ms = waited.as_millis() as u64, "privileged thread released");
        }
        WaitOutcome::TimedOut {
            pending_privileged,
            pending_waits,
        } => {
            warn!(
                pending_privileged,
                pending_waits,
                elapsed_ms = waited.as_millis() as u64,
                "await timed out"
            );
            println!(
                "bootdag: await timed out after {} ms ({} privileged, {} must-wait tasks pending)",
                waited.as_millis(),
                pending_privileged,
                pending_waits
            );
            return Ok(());
        }
    }

    // Let the remaining pool tasks drain before the executor is dropped. A
    // spent budget must not turn into a zero (indefinite) timeout.
    let remaining = timeout.map(|t| {
        t.saturating_sub(started.elapsed())
            .max(Duration::from_millis(1))
    });
    if !startup.wait_finished(remaining)? {
        println!(
            "bootdag: {} of {} tasks still running at the deadline",
            startup.remaining(),
            startup.graph().len()
        );
        return Ok(());
    }

    println!(
        "bootdag: {} tasks finished in {} ms (await released after {} ms)",
        startup.graph().len(),
        started.elapsed().as_millis(),
        waited.as_millis()
    );
    Ok(())
}

/// Simple dry-run output: print settings, tasks and the start order.
fn print_dry_run(manifest: &Manifest) -> Result<()> {
    println!("bootdag dry-run");
    println!("  config.failure_policy = {:?}", manifest.config.failure_policy);
    println!("  config.executor = {:?}", manifest.config.executor);
    match manifest.config.workers {
        Some(n) => println!("  config.workers = {n}"),
        None => println!("  config.workers = {} (default)", default_parallelism()),
    }
    match manifest.config.await_timeout() {
        Some(t) => println!("  config.await_timeout_ms = {}", t.as_millis()),
        None => println!("  config.await_timeout_ms = none"),
    }
    println!();

    println!("tasks ({}):", manifest.task.len());
    for (name, task) in manifest.task.iter() {
        println!("  - {name}");
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if task.priority != 0 {
            println!("      priority: {}", task.priority);
        }
        if task.must_run_on_privileged {
            println!("      must_run_on_privileged: true");
        }
        if task.wait_on_privileged {
            println!("      wait_on_privileged: true");
        }
        if !task.in_stage {
            println!("      in_stage: false");
        }
        if task.sleep_ms > 0 {
            println!("      sleep_ms: {}", task.sleep_ms);
        }
        if task.fail {
            println!("      fail: true");
        }
    }

    // Building the graph catches cycles and an empty frontier, which the
    // manifest validation cannot see.
    let graph = build_graph(manifest)?;
    let roots: Vec<&str> = graph
        .frontier()
        .iter()
        .map(|&id| graph.info(id).name.as_str())
        .collect();
    println!();
    println!("start order: {roots:?}");

    debug!("dry-run complete (no execution)");
    Ok(())
}
