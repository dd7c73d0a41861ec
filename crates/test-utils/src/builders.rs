#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depsched::{ProgressSink, WorkItem};

/// Shared, ordered log of task events ("A:start", "A:end", ...).
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.position(event).is_some()
    }

    /// Work item that logs `<title>:start`, sleeps, then logs `<title>:end`.
    pub fn task(&self, title: &str, duration: Duration) -> WorkItem<()> {
        let log = self.clone();
        let title = title.to_string();
        WorkItem::action(move || {
            log.push(format!("{title}:start"));
            std::thread::sleep(duration);
            log.push(format!("{title}:end"));
            Ok(())
        })
    }

    /// Work item that logs `<title>:start` and fails.
    pub fn failing(&self, title: &str) -> WorkItem<()> {
        let log = self.clone();
        let title = title.to_string();
        WorkItem::action(move || {
            log.push(format!("{title}:start"));
            anyhow::bail!("{title} exploded")
        })
    }
}

/// Work item that loops `iterations` times, sleeping `step` per iteration and
/// counting completed iterations in `counter`. Polls cancellation at the top
/// of every iteration when `cooperative` is set.
pub fn looping(
    counter: Arc<AtomicUsize>,
    iterations: usize,
    step: Duration,
    cooperative: bool,
) -> WorkItem<()> {
    WorkItem::cancellable(move |signal| {
        for _ in 0..iterations {
            if cooperative {
                signal.check()?;
            }
            std::thread::sleep(step);
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    })
}

/// Progress sink that remembers the most recent value and the report count.
#[derive(Debug, Default)]
pub struct ProgressRecorder {
    latest: AtomicI32,
    reports: AtomicUsize,
}

impl ProgressRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self) -> i32 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }
}

impl ProgressSink for ProgressRecorder {
    fn report(&self, value: i32) {
        self.latest.store(value, Ordering::SeqCst);
        self.reports.fetch_add(1, Ordering::SeqCst);
    }
}
