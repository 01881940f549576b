// tests/failure_policy.rs

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bootdag::dag::{TaskSpec, TaskState};
use bootdag::engine::StartupBuilder;
use bootdag::errors::BootError;
use bootdag::exec::WorkerPool;
use bootdag::types::FailurePolicy;
use bootdag_test_utils::fake_executor::ManualExecutor;
use bootdag_test_utils::recorder::{Phase, Recorder};
use bootdag_test_utils::{eventually, init_tracing, with_timeout};
use common::Trace;

fn failing(name: &str, sleep_ms: u64) -> TaskSpec {
    TaskSpec::new(name, move || {
        thread::sleep(Duration::from_millis(sleep_ms));
        anyhow::bail!("disk on fire")
    })
}

#[test]
fn strict_failure_aborts_run_and_skips_dependents() {
    init_tracing();

    let trace = Trace::new();
    let recorder = Arc::new(Recorder::new());
    let startup = StartupBuilder::new()
        .executor(Arc::new(WorkerPool::new(2).unwrap()))
        .policy(FailurePolicy::Strict)
        .task_listener(recorder.clone())
        .run_listener(recorder.clone())
        .add(failing("A", 0))
        .unwrap()
        .add(trace.task("B", 0).after("A"))
        .unwrap()
        .build()
        .unwrap();

    startup.start().unwrap();
    match startup.wait_finished(Some(Duration::from_secs(5))) {
        Err(BootError::TaskFailed { task, message }) => {
            assert_eq!(task, "A");
            assert!(message.contains("disk on fire"), "message was: {message}");
        }
        other => panic!("Expected TaskFailed, got: {:?}", other),
    }

    assert!(startup.is_aborted());
    assert_eq!(startup.task_state("A"), Some(TaskState::Running));
    assert_eq!(startup.task_state("B"), Some(TaskState::Idle));
    assert_eq!(trace.count("B"), 0);
    assert_eq!(recorder.count("A", Phase::Finished), 0);
    assert_eq!(recorder.run_finished(), 0);

    // The original error is handed out once.
    assert!(matches!(startup.check(), Err(BootError::RunAborted)));
}

#[test]
fn strict_failure_of_a_waited_task_releases_wait_exactly_once() {
    init_tracing();

    let trace = Trace::new();
    let startup = StartupBuilder::new()
        .executor(Arc::new(WorkerPool::new(2).unwrap()))
        .policy(FailurePolicy::Strict)
        .add(failing("Y", 20).wait_on_privileged(true))
        .unwrap()
        .add(trace.task("Z", 300).wait_on_privileged(true))
        .unwrap()
        .build()
        .unwrap();
    let startup = Arc::new(startup);

    let waiter = Arc::clone(&startup);
    let result = with_timeout(move || waiter.start_and_wait(None));
    match result {
        Err(BootError::TaskFailed { task, .. }) => assert_eq!(task, "Y"),
        other => panic!("Expected TaskFailed, got: {:?}", other),
    }

    // Y was counted, Z is still running.
    assert_eq!(startup.pending_waits(), 1);
    assert!(eventually(Duration::from_secs(2), || startup.pending_waits() == 0));
    assert_eq!(trace.count("Z"), 1);

    assert!(matches!(startup.wait(None), Err(BootError::RunAborted)));
}

#[test]
fn strict_failure_on_the_privileged_thread_is_returned_from_wait() {
    init_tracing();

    with_timeout(|| {
        let startup = StartupBuilder::new()
            .executor(Arc::new(WorkerPool::new(2).unwrap()))
            .policy(FailurePolicy::Strict)
            .add(failing("ui", 0).must_run_on_privileged(true))
            .unwrap()
            .add(TaskSpec::noop("paint").after("ui").must_run_on_privileged(true))
            .unwrap()
            .build()
            .unwrap();

        startup.start().unwrap();
        assert!(matches!(
            startup.wait(None),
            Err(BootError::TaskFailed { ref task, .. }) if task == "ui"
        ));
        assert_eq!(startup.task_state("paint"), Some(TaskState::Idle));
    });
}

#[test]
fn strict_panic_is_reported_as_task_failure() {
    init_tracing();

    let startup = StartupBuilder::new()
        .executor(Arc::new(WorkerPool::new(1).unwrap()))
        .policy(FailurePolicy::Strict)
        .add(TaskSpec::new("boom", || panic!("exploded on purpose")))
        .unwrap()
        .build()
        .unwrap();

    startup.start().unwrap();
    match startup.wait_finished(Some(Duration::from_secs(5))) {
        Err(BootError::TaskFailed { task, message }) => {
            assert_eq!(task, "boom");
            assert!(message.contains("panicked"));
            assert!(message.contains("exploded on purpose"));
        }
        other => panic!("Expected TaskFailed, got: {:?}", other),
    }
}

#[test]
fn lenient_failure_is_logged_and_dependents_proceed() {
    init_tracing();

    let trace = Trace::new();
    let recorder = Arc::new(Recorder::new());
    let startup = StartupBuilder::new()
        .executor(Arc::new(WorkerPool::new(2).unwrap()))
        .policy(FailurePolicy::Lenient)
        .run_listener(recorder.clone())
        .add(failing("A", 0))
        .unwrap()
        .add(TaskSpec::new("P", || panic!("also tolerated")))
        .unwrap()
        .add(trace.task("B", 0).after("A").after("P"))
        .unwrap()
        .build()
        .unwrap();

    startup.start().unwrap();
    assert!(startup.wait_finished(Some(Duration::from_secs(5))).unwrap());

    assert!(!startup.is_aborted());
    assert_eq!(startup.task_state("A"), Some(TaskState::Finished));
    assert_eq!(startup.task_state("P"), Some(TaskState::Finished));
    assert_eq!(trace.count("B"), 1);
    assert_eq!(recorder.run_finished(), 1);
    assert!(startup.check().is_ok());
}

#[test]
fn lenient_is_the_default_policy() {
    let startup = StartupBuilder::new()
        .executor(Arc::new(ManualExecutor::new()))
        .add(TaskSpec::noop("a"))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(startup.policy(), FailurePolicy::Lenient);
}
