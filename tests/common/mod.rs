#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bootdag::dag::TaskSpec;

/// Shared log of task names, appended to by task bodies.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    /// A task whose body records its own name after sleeping `sleep_ms`.
    pub fn task(&self, name: &str, sleep_ms: u64) -> TaskSpec {
        let log = Arc::clone(&self.0);
        let label = name.to_string();
        TaskSpec::new(name, move || {
            if sleep_ms > 0 {
                thread::sleep(Duration::from_millis(sleep_ms));
            }
            log.lock().unwrap().push(label);
            Ok(())
        })
    }
}
