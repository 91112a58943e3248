// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named stopwatches for timing units of work.
//!
//! A [`Timer`] is a registry keyed by name. Cloning it yields another handle
//! to the same registry, so the orchestrator can hand one timer to every
//! worker and read every duration afterwards. Stopwatches under distinct
//! names never interfere with each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Stopwatch {
    started: Instant,
    stopped: Option<Instant>,
}

impl Stopwatch {
    fn elapsed(&self) -> Duration {
        match self.stopped {
            Some(stopped) => stopped.duration_since(self.started),
            None => self.started.elapsed(),
        }
    }
}

/// Shared registry of named stopwatches.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    inner: Arc<Mutex<HashMap<String, Stopwatch>>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the stopwatch `name`, restarting it if it already exists.
    pub fn start(&self, name: &str) {
        self.inner.lock().insert(
            name.to_string(),
            Stopwatch {
                started: Instant::now(),
                stopped: None,
            },
        );
    }

    /// Stop the stopwatch `name` and return its elapsed time.
    ///
    /// Returns `None` if `name` was never started. Stopping an already
    /// stopped watch keeps the first stop time.
    pub fn stop(&self, name: &str) -> Option<Duration> {
        let mut watches = self.inner.lock();
        let watch = watches.get_mut(name)?;
        if watch.stopped.is_none() {
            watch.stopped = Some(Instant::now());
        }
        Some(watch.elapsed())
    }

    /// Elapsed time of `name`: frozen once stopped, still growing while running.
    pub fn duration(&self, name: &str) -> Option<Duration> {
        self.inner.lock().get(name).map(Stopwatch::elapsed)
    }

    /// Returns true if `name` has been started and not yet stopped.
    pub fn is_running(&self, name: &str) -> bool {
        self.inner
            .lock()
            .get(name)
            .is_some_and(|watch| watch.stopped.is_none())
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
