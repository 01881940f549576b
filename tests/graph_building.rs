// tests/graph_building.rs

use std::sync::Arc;

use bootdag::dag::{GraphBuilder, TaskSpec, TaskState};
use bootdag::engine::StartupBuilder;
use bootdag::errors::BootError;
use bootdag_test_utils::fake_executor::ManualExecutor;

fn builder() -> StartupBuilder {
    StartupBuilder::new().executor(Arc::new(ManualExecutor::new()))
}

#[test]
fn duplicate_task_names_are_rejected() {
    let result = builder()
        .add(TaskSpec::noop("net"))
        .unwrap()
        .add(TaskSpec::noop("net"));

    match result {
        Err(BootError::DuplicateTask(name)) => assert_eq!(name, "net"),
        Err(e) => panic!("Expected DuplicateTask, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_task_names_are_rejected() {
    assert!(matches!(
        builder().add(TaskSpec::noop("")),
        Err(BootError::EmptyTaskName)
    ));
    assert!(matches!(
        builder().add(TaskSpec::noop("   ")),
        Err(BootError::EmptyTaskName)
    ));
}

#[test]
fn unregistered_dependency_names_the_missing_task() {
    let result = builder()
        .add(TaskSpec::noop("ui").after("ghost"))
        .unwrap()
        .build();

    match result {
        Err(err @ BootError::UnregisteredDependency { .. }) => {
            assert!(err.to_string().contains("ghost"));
            assert!(err.to_string().contains("ui"));
            if let BootError::UnregisteredDependency { task, dependency } = err {
                assert_eq!(task, "ui");
                assert_eq!(dependency, "ghost");
            }
        }
        Err(e) => panic!("Expected UnregisteredDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn graph_without_a_start_task_is_rejected() {
    let result = builder()
        .add(TaskSpec::noop("a").after("b"))
        .unwrap()
        .add(TaskSpec::noop("b").after("a"))
        .unwrap()
        .build();

    assert!(matches!(result, Err(BootError::EmptyFrontier)));
}

#[test]
fn cycle_behind_a_root_is_rejected() {
    let result = builder()
        .add(TaskSpec::noop("root"))
        .unwrap()
        .add(TaskSpec::noop("b").after("root").after("c"))
        .unwrap()
        .add(TaskSpec::noop("c").after("b"))
        .unwrap()
        .build();

    match result {
        Err(BootError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('b') || msg.contains('c'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let result = builder()
        .add(TaskSpec::noop("loop").after("loop"))
        .unwrap()
        .build();

    assert!(matches!(result, Err(BootError::SelfDependency(ref n)) if n == "loop"));
}

#[test]
fn missing_executor_is_rejected() {
    let result = StartupBuilder::new().add(TaskSpec::noop("a")).unwrap().build();
    assert!(matches!(result, Err(BootError::MissingExecutor)));
}

#[test]
fn empty_task_set_builds_but_does_not_start() {
    let startup = builder().build().unwrap();
    assert!(startup.graph().is_empty());
    assert!(matches!(startup.start(), Err(BootError::EmptyFrontier)));
}

#[test]
fn starting_twice_is_an_error() {
    let executor = Arc::new(ManualExecutor::new());
    let startup = StartupBuilder::new()
        .executor(executor.clone())
        .add(TaskSpec::noop("a"))
        .unwrap()
        .add(TaskSpec::noop("b").after("a"))
        .unwrap()
        .build()
        .unwrap();

    startup.start().unwrap();
    assert!(matches!(startup.start(), Err(BootError::RunAlreadyStarted)));

    // A frontier task is already Waiting.
    assert!(matches!(
        startup.start_task("a"),
        Err(BootError::TaskStartedTwice(ref n)) if n == "a"
    ));
    assert!(matches!(
        startup.start_task("nope"),
        Err(BootError::TaskNotFound(_))
    ));

    executor.run_all();
    assert!(matches!(
        startup.start_task("b"),
        Err(BootError::TaskStartedTwice(ref n)) if n == "b"
    ));
    assert_eq!(executor.submitted(), 2);
}

#[test]
fn add_dependency_registers_both_sides_of_the_edge() {
    let mut builder = GraphBuilder::new();
    builder.add(TaskSpec::noop("a")).unwrap();
    builder.add(TaskSpec::noop("b")).unwrap();
    builder.add_dependency("b", "a").unwrap();
    // Declaring the same edge twice is a no-op.
    builder.add_dependency("b", "a").unwrap();
    let graph = builder.build().unwrap();

    let a = graph.id_of("a").unwrap();
    let b = graph.id_of("b").unwrap();
    assert_eq!(graph.pending_dependencies(b), 1);
    assert_eq!(graph.predecessors(b), &[a]);
    assert_eq!(graph.successors(a), &[b]);
    assert_eq!(graph.frontier(), &[a]);
    assert_eq!(graph.state(b), TaskState::Idle);
}

#[test]
fn add_dependency_rejects_self_edges_and_unknown_tasks() {
    let mut builder = GraphBuilder::new();
    builder.add(TaskSpec::noop("a")).unwrap();

    assert!(matches!(
        builder.add_dependency("a", "a"),
        Err(BootError::SelfDependency(ref n)) if n == "a"
    ));
    assert!(matches!(
        builder.add_dependency("ghost", "a"),
        Err(BootError::TaskNotFound(ref n)) if n == "ghost"
    ));
}

#[test]
fn edges_added_by_name_go_through_build_validation() {
    // Closing a cycle with an explicit edge is caught when the graph is built.
    let result = builder()
        .add(TaskSpec::noop("root"))
        .unwrap()
        .add(TaskSpec::noop("b").after("root"))
        .unwrap()
        .add(TaskSpec::noop("c").after("b"))
        .unwrap()
        .add_dependency("b", "c")
        .unwrap()
        .build();
    assert!(matches!(result, Err(BootError::DagCycle(_))));

    // So is a dependency on a task that was never registered.
    let result = builder()
        .add(TaskSpec::noop("a"))
        .unwrap()
        .add_dependency("a", "ghost")
        .unwrap()
        .build();
    assert!(matches!(
        result,
        Err(BootError::UnregisteredDependency { ref dependency, .. }) if dependency == "ghost"
    ));

    // And an edge that leaves no start task.
    let result = builder()
        .add(TaskSpec::noop("x"))
        .unwrap()
        .add(TaskSpec::noop("y").after("x"))
        .unwrap()
        .add_dependency("x", "y")
        .unwrap()
        .build();
    assert!(matches!(result, Err(BootError::EmptyFrontier)));
}

#[test]
fn graph_exposes_task_metadata() {
    let mut builder = GraphBuilder::new();
    builder
        .add(
            TaskSpec::noop("ui")
                .priority(3)
                .must_run_on_privileged(true)
                .wait_on_privileged(true)
                .in_stage(false),
        )
        .unwrap();
    assert_eq!(builder.len(), 1);
    let graph = builder.build().unwrap();

    let id = graph.id_of("ui").unwrap();
    let info = graph.info(id);
    assert_eq!(info.name, "ui");
    assert_eq!(info.priority, 3);
    assert!(info.must_run_on_privileged);
    assert!(info.wait_on_privileged);
    assert!(!info.in_stage);
    assert_eq!(graph.tasks().collect::<Vec<_>>(), vec!["ui"]);
    assert_eq!(graph.unfinished(), vec!["ui".to_string()]);
    assert!(graph.id_of("missing").is_none());
}
