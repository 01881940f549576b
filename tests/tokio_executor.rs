// tests/tokio_executor.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use bootdag::engine::{StartupBuilder, WaitOutcome};
use bootdag::exec::TokioExecutor;
use bootdag_test_utils::init_tracing;
use bootdag_test_utils::recorder::Recorder;
use common::Trace;

#[test]
fn tasks_run_on_the_tokio_blocking_pool() {
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("bootdag-tokio-test")
        .enable_all()
        .build()
        .unwrap();

    let trace = Trace::new();
    let recorder = Arc::new(Recorder::new());
    let startup = StartupBuilder::new()
        .executor(Arc::new(TokioExecutor::new(runtime.handle().clone())))
        .run_listener(recorder.clone())
        .task_listener(recorder.clone())
        .add(trace.task("fetch", 20))
        .unwrap()
        .add(trace.task("parse", 5).after("fetch").wait_on_privileged(true))
        .unwrap()
        .add(trace.task("render", 0).after("parse").must_run_on_privileged(true))
        .unwrap()
        .build()
        .unwrap();

    let me = std::thread::current().id();
    let outcome = startup.start_and_wait(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(outcome, WaitOutcome::Completed);

    assert_eq!(trace.names(), vec!["fetch", "parse", "render"]);
    assert_eq!(recorder.thread_of("render"), me);
    assert_ne!(recorder.thread_of("fetch"), me);
    assert!(recorder.wait_for_run_finish(Duration::from_secs(5)));
    assert_eq!(recorder.run_finished(), 1);
}

#[test]
fn current_handle_is_picked_up_inside_a_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let executor = runtime.block_on(async { TokioExecutor::current() });

    let trace = Trace::new();
    let startup = StartupBuilder::new()
        .executor(Arc::new(executor))
        .add(trace.task("only", 0))
        .unwrap()
        .build()
        .unwrap();

    startup.start().unwrap();
    assert!(startup.wait_finished(Some(Duration::from_secs(5))).unwrap());
    assert_eq!(trace.count("only"), 1);
}
