// tests/worker_pool.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bootdag::exec::{Executor, WorkerPool, default_parallelism};
use bootdag_test_utils::{eventually, init_tracing};

#[test]
fn default_pool_has_at_least_three_workers() {
    let pool = WorkerPool::with_default_parallelism().unwrap();
    assert_eq!(pool.threads(), default_parallelism());
    assert!(pool.threads() >= 3);
}

#[test]
fn zero_threads_still_spawns_one_worker() {
    let pool = WorkerPool::new(0).unwrap();
    assert_eq!(pool.threads(), 1);
}

#[test]
fn a_panicking_job_does_not_take_the_worker_down() {
    init_tracing();

    let pool = WorkerPool::new(1).unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    pool.execute(Box::new(|| panic!("job blew up")));
    for _ in 0..3 {
        let done = Arc::clone(&done);
        pool.execute(Box::new(move || {
            done.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert!(eventually(Duration::from_secs(2), || {
        done.load(Ordering::SeqCst) == 3
    }));
}

#[test]
fn dropping_the_pool_runs_queued_jobs_first() {
    let done = Arc::new(AtomicUsize::new(0));
    {
        let pool = WorkerPool::new(2).unwrap();
        for _ in 0..10 {
            let done = Arc::clone(&done);
            pool.execute(Box::new(move || {
                std::thread::sleep(Duration::from_millis(2));
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }
    }
    assert_eq!(done.load(Ordering::SeqCst), 10);
}
